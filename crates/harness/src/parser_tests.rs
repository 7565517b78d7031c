#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::screen::Screen;

#[test]
fn escape_sequence_split_across_chunks() {
    let mut whole = Screen::new(20, 4);
    whole.feed(b"ab\x1b[1;1HX");

    let mut split = Screen::new(20, 4);
    split.feed(b"ab\x1b");
    split.feed(b"[1;");
    split.feed(b"1HX");

    assert_eq!(whole.render(), split.render());
    assert_eq!(split.text()[0], "Xb");
}

#[test]
fn utf8_scalar_split_across_chunks() {
    let bytes = "héllo".as_bytes();
    let mut split = Screen::new(20, 2);
    split.feed(&bytes[..2]); // cuts é in half
    split.feed(&bytes[2..]);
    assert_eq!(split.text()[0], "héllo");
}

#[test]
fn unknown_csi_final_is_ignored() {
    let mut screen = Screen::new(20, 2);
    screen.feed(b"before\x1b[12;34~after");
    assert_eq!(screen.text()[0], "beforeafter");
}

#[test]
fn private_mode_sequences_are_consumed() {
    let mut screen = Screen::new(20, 2);
    screen.feed(b"x\x1b[?25l\x1b[?1049hy");
    assert_eq!(screen.text()[0], "xy");
}

#[test]
fn unknown_escape_dispatch_is_ignored() {
    let mut screen = Screen::new(20, 2);
    screen.feed(b"a\x1b=b\x1b>c");
    // Keypad mode switches are consumed without effect.
    assert_eq!(screen.text()[0], "abc");
}

#[test]
fn osc_payload_is_swallowed_bel_terminated() {
    let mut screen = Screen::new(40, 2);
    screen.feed(b"\x1b]0;window title\x07visible");
    assert_eq!(screen.text()[0], "visible");
}

#[test]
fn osc_payload_is_swallowed_st_terminated() {
    let mut screen = Screen::new(40, 2);
    screen.feed(b"\x1b]2;title\x1b\\visible");
    assert_eq!(screen.text()[0], "visible");
}

#[test]
fn osc_split_across_chunks() {
    let mut screen = Screen::new(40, 2);
    screen.feed(b"\x1b]0;half");
    screen.feed(b" title\x07done");
    assert_eq!(screen.text()[0], "done");
}

#[test]
fn malformed_sequences_never_corrupt_the_grid() {
    let mut screen = Screen::new(20, 4);
    screen.feed(b"ok");
    // Garbage: bare ESC at EOF-ish boundary, stray continuation bytes,
    // over-long CSI parameter.
    screen.feed(b"\x1b");
    screen.feed(&[0x80, 0xbf]);
    screen.feed(b"\x1b[99999999999999999999m");
    screen.feed(b"!");
    assert_eq!(screen.grid().rows(), 4);
    assert!(screen.text()[0].starts_with("ok"));
    assert!(screen.render().contains('!'));
}

#[test]
fn control_bytes_act_inside_pending_csi() {
    // A CR arriving mid-sequence still executes; real terminals interleave
    // C0 controls with escape parsing.
    let mut screen = Screen::new(20, 2);
    screen.feed(b"abc\x1b[\r2KX");
    assert_eq!(screen.text()[0], "X");
}

#[test]
fn nel_and_index_move_down() {
    let mut screen = Screen::new(20, 3);
    screen.feed(b"one\x1bEtwo");
    assert_eq!(screen.text()[0], "one");
    assert_eq!(screen.text()[1], "two");
}

#[test]
fn reverse_index_moves_up() {
    let mut screen = Screen::new(20, 3);
    screen.feed(b"one\r\ntwo\x1bM\rX");
    assert_eq!(screen.text()[0], "Xne");
}

#[test]
fn scroll_up_sequence() {
    let mut screen = Screen::new(20, 3);
    screen.feed(b"a\r\nb\r\nc\x1b[S");
    let text = screen.text();
    assert_eq!(text[0], "b");
    assert_eq!(text[1], "c");
    assert_eq!(text[2], "");
}
