/// End-to-end walk tests against a real temporary filesystem.
///
/// These drive `Walker`, `walk` and `ScanSession` exactly as a front end
/// would, and check the event stream: one structure outcome first, one
/// outcome per file, a finished event last.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tree_digest::{
    walk, DecodeChain, OutcomeKind, ScanEvent, ScanOutcome, ScanRequest, ScanSession, TextDecoder,
    Transcript, WalkPhase, Walker,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// ```text
/// root/
///   a.txt      "hello"
///   b.png      (binary)
///   sub/
///     c.md     "world"
/// ```
fn build_sample_tree(root: &Path) {
    fs::write(root.join("a.txt"), "hello").unwrap();
    fs::write(root.join("b.png"), [0x89, b'P', b'N', b'G']).unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("c.md"), "world").unwrap();
}

fn request(root: &Path) -> ScanRequest {
    ScanRequest::builder()
        .root(root)
        .max_depth(5)
        .max_files(1000)
        .extract_content(true)
        .build()
}

fn outcomes(events: &[ScanEvent]) -> Vec<&ScanOutcome> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Outcome(o) => Some(o),
            _ => None,
        })
        .collect()
}

fn file_outcomes(events: &[ScanEvent]) -> Vec<&ScanOutcome> {
    outcomes(events)
        .into_iter()
        .filter(|o| o.kind != OutcomeKind::Structure)
        .collect()
}

fn structure(events: &[ScanEvent]) -> String {
    match &events[0] {
        ScanEvent::Outcome(o) if o.kind == OutcomeKind::Structure => o.content.clone().unwrap(),
        other => panic!("first event is not the structure: {:?}", other),
    }
}

fn assert_framing(events: &[ScanEvent]) {
    let structures = outcomes(events)
        .iter()
        .filter(|o| o.kind == OutcomeKind::Structure)
        .count();
    assert_eq!(structures, 1, "exactly one structure outcome");
    assert!(matches!(&events[0], ScanEvent::Outcome(o) if o.kind == OutcomeKind::Structure));

    let finished = events.iter().filter(|e| e.is_finished()).count();
    assert_eq!(finished, 1, "exactly one finished event");
    assert!(events.last().unwrap().is_finished());
}

fn progress_values(events: &[ScanEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress(n) => Some(*n),
            _ => None,
        })
        .collect()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn sample_tree_extracts_text_and_skips_binary() {
    let dir = TempDir::new().unwrap();
    build_sample_tree(dir.path());

    let events = walk(request(dir.path()));
    assert_framing(&events);

    let listing = structure(&events);
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines[0], dir.path().file_name().unwrap().to_string_lossy());
    assert_eq!(lines.len(), 5);
    for name in ["a.txt", "b.png", "sub"] {
        assert!(
            lines.iter().any(|l| l.ends_with(name) && !l.starts_with("│") && !l.starts_with(' ')),
            "{} listed at the top level:\n{}",
            name,
            listing
        );
    }
    assert!(lines
        .iter()
        .any(|l| *l == "│   └── c.md" || *l == "    └── c.md"));

    let files = file_outcomes(&events);
    assert_eq!(files.len(), 3);
    let by_name: BTreeMap<&str, &ScanOutcome> = files.iter().map(|o| (o.name.as_str(), *o)).collect();

    assert_eq!(by_name["a.txt"].kind, OutcomeKind::Extracted);
    assert_eq!(by_name["a.txt"].content.as_deref(), Some("hello"));
    assert_eq!(by_name["b.png"].kind, OutcomeKind::SkippedBinaryExt);
    assert_eq!(by_name["b.png"].content, None);
    assert_eq!(by_name["c.md"].kind, OutcomeKind::Extracted);
    assert_eq!(by_name["c.md"].content.as_deref(), Some("world"));
    assert!(by_name["c.md"].path.is_absolute());
    assert!(by_name["c.md"].path.ends_with("sub/c.md"));

    match events.last() {
        Some(ScanEvent::Finished(summary)) => {
            assert_eq!(summary.phase, WalkPhase::Completed);
            assert_eq!(summary.visited_files, 2);
            assert_eq!(summary.extracted, 2);
            assert_eq!(summary.skipped, 1);
            assert_eq!(summary.listed_entries, 4);
        }
        other => panic!("expected Finished, got {:?}", other),
    }
}

#[test]
fn single_file_without_content() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("notes.log");
    fs::write(&file, "never read").unwrap();

    let req = ScanRequest::builder().root(&file).extract_content(false).build();
    let events = walk(req);
    assert_framing(&events);

    assert_eq!(structure(&events), "notes.log");
    let files = file_outcomes(&events);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].kind, OutcomeKind::NoContentRequested);
    assert_eq!(files[0].content, None);
    assert_eq!(progress_values(&events), vec![1]);
}

#[test]
fn file_limit_stops_the_walk() {
    let dir = TempDir::new().unwrap();
    for d in 0..3 {
        let sub = dir.path().join(format!("d{}", d));
        fs::create_dir(&sub).unwrap();
        for i in 0..500 {
            fs::write(sub.join(format!("f{:03}.txt", i)), "x").unwrap();
        }
    }

    let req = ScanRequest::builder().root(dir.path()).max_files(1000).build();
    let events = walk(req);
    assert_framing(&events);

    let files = file_outcomes(&events);
    assert_eq!(files.len(), 1000);
    assert!(files.iter().all(|o| o.kind == OutcomeKind::Extracted));

    let progress = progress_values(&events);
    assert_eq!(progress.len(), 1000);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(progress.iter().all(|&n| n <= 1000));

    match events.last() {
        Some(ScanEvent::Finished(summary)) => {
            assert_eq!(summary.phase, WalkPhase::Cancelled);
            assert_eq!(summary.visited_files, 1000);
        }
        other => panic!("expected Finished, got {:?}", other),
    }
}

#[test]
fn skips_do_not_count_toward_limit() {
    let dir = TempDir::new().unwrap();
    for i in 0..5 {
        fs::write(dir.path().join(format!("img{}.png", i)), "x").unwrap();
    }
    for i in 0..3 {
        fs::write(dir.path().join(format!("t{}.txt", i)), "x").unwrap();
    }

    // One above the text files, so enumeration order cannot end the walk early
    let req = ScanRequest::builder().root(dir.path()).max_files(4).build();
    let events = walk(req);
    let files = file_outcomes(&events);
    assert_eq!(files.len(), 8);
    assert_eq!(progress_values(&events), vec![1, 2, 3]);
    match events.last() {
        Some(ScanEvent::Finished(summary)) => assert_eq!(summary.phase, WalkPhase::Completed),
        other => panic!("expected Finished, got {:?}", other),
    }
}

#[test]
fn undecodable_file_reports_read_error() {
    struct AlwaysFails;

    impl TextDecoder for AlwaysFails {
        fn label(&self) -> &str {
            "always-fails"
        }

        fn decode(&self, _bytes: &[u8]) -> Result<String, String> {
            Err("malformed sequence".to_string())
        }
    }

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.txt"), [0xE4, 0xB8, 0xFF, 0xFE, 0x80]).unwrap();

    let chain = DecodeChain::new(vec![
        Box::new(AlwaysFails),
        Box::new(AlwaysFails),
        Box::new(AlwaysFails),
    ]);
    let mut events = Vec::new();
    Walker::new(request(dir.path()))
        .with_decoders(chain)
        .walk(&mut events);
    assert_framing(&events);

    let files = file_outcomes(&events);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].kind, OutcomeKind::ReadError);
    let diagnostic = files[0].content.as_deref().unwrap();
    assert!(diagnostic.contains("broken.txt"));
    assert!(diagnostic.contains("malformed sequence"));
}

#[test]
fn faulting_decoder_spares_sibling_files() {
    struct Explodes;

    impl TextDecoder for Explodes {
        fn label(&self) -> &str {
            "explodes"
        }

        fn decode(&self, _bytes: &[u8]) -> Result<String, String> {
            panic!("decoder fault")
        }
    }

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("one.txt"), "1").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("two.txt"), "2").unwrap();

    let mut events = Vec::new();
    Walker::new(request(dir.path()))
        .with_decoders(DecodeChain::new(vec![Box::new(Explodes)]))
        .walk(&mut events);
    assert_framing(&events);

    let mut names: Vec<&str> = file_outcomes(&events).iter().map(|o| o.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["one.txt", "two.txt"]);
    assert!(file_outcomes(&events)
        .iter()
        .all(|o| o.kind == OutcomeKind::ReadError));
}

#[test]
fn mostly_utf8_file_keeps_its_text() {
    let dir = TempDir::new().unwrap();
    let mut bytes = "中文 ok".as_bytes().to_vec();
    bytes.push(0x80);
    fs::write(dir.path().join("a.txt"), bytes).unwrap();

    let events = walk(ScanRequest::new(dir.path()));
    let files = file_outcomes(&events);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].kind, OutcomeKind::Extracted);
    assert!(files[0].content.as_deref().unwrap().starts_with("中文 ok"));
}

#[cfg(unix)]
#[test]
fn unreadable_directory_is_listed_empty() {
    use std::os::unix::fs::PermissionsExt;
    use tree_digest::ScanErrorKind;

    let dir = TempDir::new().unwrap();
    build_sample_tree(dir.path());
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden.txt"), "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not bind root
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let events = walk(request(dir.path()));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    assert_framing(&events);

    let listing = structure(&events);
    assert!(listing.lines().any(|l| l.ends_with("── locked")));
    assert!(!listing.contains("hidden.txt"));

    let mut names: Vec<&str> = file_outcomes(&events).iter().map(|o| o.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["a.txt", "b.png", "c.md"]);

    match events.last() {
        Some(ScanEvent::Finished(summary)) => {
            assert_eq!(summary.phase, WalkPhase::Completed);
            assert!(summary.errors.iter().any(|e| e.kind == ScanErrorKind::PermissionDenied
                && e.path.as_deref() == Some(locked.as_path())));
        }
        other => panic!("expected Finished, got {:?}", other),
    }
}

#[test]
fn rescanning_is_idempotent() {
    let dir = TempDir::new().unwrap();
    build_sample_tree(dir.path());
    fs::create_dir_all(dir.path().join("sub").join("deeper")).unwrap();
    fs::write(dir.path().join("sub").join("deeper").join("e.rs"), "fn main() {}").unwrap();

    let summarize = |events: &[ScanEvent]| -> (String, Vec<(String, OutcomeKind)>) {
        let mut pairs: Vec<(String, OutcomeKind)> = file_outcomes(events)
            .iter()
            .map(|o| (o.name.clone(), o.kind))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        (structure(events), pairs)
    };

    let first = summarize(&walk(request(dir.path())));
    let second = summarize(&walk(request(dir.path())));
    assert_eq!(first, second);
}

#[test]
fn depth_limit_bounds_both_passes() {
    let dir = TempDir::new().unwrap();
    let deep = dir.path().join("l0").join("l1").join("l2");
    fs::create_dir_all(&deep).unwrap();
    fs::write(dir.path().join("l0").join("top.txt"), "t").unwrap();
    fs::write(deep.join("bottom.txt"), "b").unwrap();

    let req = ScanRequest::builder().root(dir.path()).max_depth(1).build();
    let events = walk(req);

    let listing = structure(&events);
    assert!(listing.contains("── l1"));
    assert!(!listing.contains("── l2"));

    let names: Vec<&str> = file_outcomes(&events).iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["top.txt"]);
}

#[test]
fn transcript_from_walk() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();

    let events = walk(request(dir.path()));
    let transcript = Transcript::from_events(&events, true);
    let text = transcript.as_str();

    assert!(text.starts_with("文件结构:\n"));
    assert!(text.contains("└── a.txt"));
    assert!(text.contains(&format!("{}\n文件名: a.txt\n{}\nhello\n", "=".repeat(40), "-".repeat(71))));
}

#[cfg(unix)]
#[test]
fn symlinks_are_listed_but_not_visited() {
    let dir = TempDir::new().unwrap();
    build_sample_tree(dir.path());
    std::os::unix::fs::symlink(dir.path().join("sub"), dir.path().join("link")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("alias.txt")).unwrap();

    let events = walk(request(dir.path()));
    let listing = structure(&events);
    assert!(listing.lines().any(|l| l.ends_with("── link")));
    assert!(listing.lines().any(|l| l.ends_with("── alias.txt")));

    let names: Vec<&str> = file_outcomes(&events).iter().map(|o| o.name.as_str()).collect();
    assert!(!names.contains(&"alias.txt"));
    assert_eq!(names.iter().filter(|n| **n == "c.md").count(), 1);
}

// ── Sessions ─────────────────────────────────────────────────────────────────

#[test]
fn session_streams_until_finished() {
    let dir = TempDir::new().unwrap();
    build_sample_tree(dir.path());

    let mut session = ScanSession::new(request(dir.path()));
    let started = session.start(dir.path(), true).unwrap();
    assert_eq!(started.expected, 2);

    let mut events = Vec::new();
    loop {
        let event = started
            .events
            .recv_timeout(Duration::from_secs(30))
            .expect("walker did not finish within 30 seconds");
        let done = event.is_finished();
        events.push(event);
        if done {
            break;
        }
    }
    session.join();
    assert!(!session.is_running());
    assert_framing(&events);
}

#[test]
fn new_scan_cancels_previous() {
    let dir = TempDir::new().unwrap();
    for i in 0..200 {
        fs::write(dir.path().join(format!("f{}.txt", i)), "x").unwrap();
    }

    let mut session = ScanSession::default();
    let first = session.start(dir.path(), true).unwrap();
    let second = session.start(dir.path(), false).unwrap();

    // The first walker was joined, so its stream is complete and closed
    let first_events: Vec<ScanEvent> = first.events.iter().collect();
    assert_framing(&first_events);

    let second_events: Vec<ScanEvent> = second.events.iter().collect();
    assert_framing(&second_events);
    assert_eq!(file_outcomes(&second_events).len(), 200);
    assert!(file_outcomes(&second_events)
        .iter()
        .all(|o| o.kind == OutcomeKind::NoContentRequested));
}

#[test]
fn cancelled_session_still_finishes() {
    let dir = TempDir::new().unwrap();
    for i in 0..300 {
        fs::write(dir.path().join(format!("f{}.txt", i)), "x").unwrap();
    }

    let mut session = ScanSession::default();
    let started = session.start(dir.path(), true).unwrap();
    session.cancel();
    session.cancel();
    session.join();

    let events: Vec<ScanEvent> = started.events.iter().collect();
    assert_framing(&events);
    assert!(file_outcomes(&events).len() <= 300);
}
