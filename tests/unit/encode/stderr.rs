use super::*;

#[test]
fn fatal_keywords_are_case_insensitive() {
    assert!(is_fatal_line("Error while opening encoder"));
    assert!(is_fatal_line("pipe:0: Cannot open input"));
    assert!(is_fatal_line("in.wav: No such file or directory"));
    assert!(is_fatal_line("Conversion FAILED!"));
    assert!(!is_fatal_line("frame=  30 fps=0.0 q=28.0 size=0kB"));
}

#[test]
fn ring_keeps_only_the_latest_lines() {
    let tail = StderrTail::new(3);
    for i in 0..5 {
        tail.push(format!("line {i}"));
    }
    assert_eq!(tail.lines(), vec!["line 2", "line 3", "line 4"]);
    assert_eq!(tail.total_lines(), 5);
}

#[test]
fn first_fatal_survives_eviction() {
    let tail = StderrTail::new(2);
    tail.push("Error: boom");
    tail.push("ok");
    tail.push("ok again");
    tail.push("failed later");
    assert_eq!(tail.first_fatal().as_deref(), Some("Error: boom"));
}

#[test]
fn tail_bytes_respects_limit_and_char_boundaries() {
    let tail = StderrTail::default();
    tail.push("a".repeat(900));
    tail.push("é".repeat(200));
    let out = tail.tail_bytes(1000);
    assert!(out.len() <= 1000);
    assert!(out.ends_with('é'));

    let small = StderrTail::default();
    small.push("short");
    assert_eq!(small.tail_bytes(1000), "short");
}

#[test]
fn drain_collects_lines_until_eof() {
    let tail = Arc::new(StderrTail::default());
    let input = std::io::Cursor::new(b"first\n\nsecond error\nthird".to_vec());
    spawn_drain(input, Arc::clone(&tail)).join().unwrap();
    assert_eq!(tail.lines(), vec!["first", "second error", "third"]);
    assert_eq!(tail.first_fatal().as_deref(), Some("second error"));
}
