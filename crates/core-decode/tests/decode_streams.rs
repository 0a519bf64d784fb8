//! Decoder behavior over realistic byte streams: text, cursor movement,
//! attributes, screen switching, and degraded handling of junk.

use core_decode::Decoder;
use core_screen::{Color, Cursor, Decoration, FontStyle, Intensity, Screen};

fn decode(screen: &mut Screen, bytes: &[u8]) -> Decoder {
    let mut decoder = Decoder::new();
    decoder.decode_input(screen, bytes);
    decoder
}

fn row(screen: &Screen, index: usize) -> String {
    screen
        .line(index)
        .map(|line| line.content())
        .unwrap_or_default()
}

#[test]
fn plain_ascii_fills_cells_and_advances() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"hello\n");
    assert_eq!(row(&screen, 0), "hello");
    for (i, expected) in ["h", "e", "l", "l", "o"].iter().enumerate() {
        assert_eq!(screen.line(0).unwrap().cell(i).unwrap().text(), *expected);
    }
    assert_eq!(screen.cursor_pos(), Cursor { x: 0, y: 1 });
}

#[test]
fn carriage_return_and_backspace_move_the_cursor() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"abc\rx");
    assert_eq!(row(&screen, 0), "xbc");

    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"ab\x08c");
    assert_eq!(row(&screen, 0), "ac");
}

#[test]
fn tab_is_three_spaces() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"a\tb");
    assert_eq!(row(&screen, 0), "a   b");
}

#[test]
fn bell_is_surfaced_not_rendered() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"a\x07b");
    assert_eq!(row(&screen, 0), "ab");
    assert!(screen.take_bell());
}

#[test]
fn cup_moves_to_row_and_column() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"\x1b[5;3H");
    assert_eq!(screen.cursor_pos(), Cursor { x: 2, y: 4 });
}

#[test]
fn cup_defaults_home() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"x\x1b[H");
    assert_eq!(screen.cursor_pos(), Cursor { x: 0, y: 0 });
}

#[test]
fn relative_cursor_motions() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"\x1b[10;10H\x1b[2A\x1b[3B\x1b[4C\x1b[D");
    assert_eq!(screen.cursor_pos(), Cursor { x: 12, y: 10 });

    decode(&mut screen, b"\x1b[7G");
    assert_eq!(screen.cursor_pos().x, 6);

    decode(&mut screen, b"\x1b[3d");
    assert_eq!(screen.cursor_pos(), Cursor { x: 0, y: 2 });

    decode(&mut screen, b"\x1b[2e");
    assert_eq!(screen.cursor_pos().y, 4);
}

#[test]
fn motions_clamp_at_screen_edges() {
    let mut screen = Screen::new(10, 5);
    decode(&mut screen, b"\x1b[99A\x1b[99D");
    assert_eq!(screen.cursor_pos(), Cursor { x: 0, y: 0 });
    decode(&mut screen, b"\x1b[99B\x1b[99C");
    assert_eq!(screen.cursor_pos(), Cursor { x: 9, y: 4 });
}

#[test]
fn sgr_reset_then_red_foreground() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"\x1b[0m\x1b[31m");
    let style = screen.style();
    assert_eq!(style.fg, Color::Idx4(1));
    assert_eq!(style.bg, Color::Default);
    assert_eq!(style.font_style, FontStyle::Regular);
    assert_eq!(style.intensity, Intensity::Normal);
}

#[test]
fn sgr_bold_is_also_bright() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"\x1b[1m");
    assert_eq!(screen.style().font_style, FontStyle::Bold);
    assert_eq!(screen.style().intensity, Intensity::Bright);
}

#[test]
fn sgr_bright_palette_and_background() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"\x1b[92;44m");
    assert_eq!(screen.style().fg, Color::Idx4(10));
    assert_eq!(screen.style().bg, Color::Idx4(4));
    decode(&mut screen, b"\x1b[39;49m");
    assert_eq!(screen.style().fg, Color::Default);
    assert_eq!(screen.style().bg, Color::Default);
}

#[test]
fn sgr_extended_colors_semicolon_form() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"\x1b[38;5;196m");
    assert_eq!(screen.style().fg, Color::Idx8(196));

    decode(&mut screen, b"\x1b[48;2;12;34;56m");
    assert_eq!(screen.style().bg, Color::Rgb(12, 34, 56));

    // A trailing plain parameter still applies after the extension.
    decode(&mut screen, b"\x1b[38;2;1;2;3;4m");
    assert_eq!(screen.style().fg, Color::Rgb(1, 2, 3));
    assert_eq!(screen.style().decoration, Decoration::Underline);
}

#[test]
fn sgr_unknown_parameters_do_not_stop_the_rest() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"\x1b[95;31m");
    // 95 applies, then 31 overrides.
    assert_eq!(screen.style().fg, Color::Idx4(1));
    decode(&mut screen, b"\x1b[63;32m");
    assert_eq!(screen.style().fg, Color::Idx4(2));
}

#[test]
fn styled_cells_carry_their_attributes() {
    let mut screen = Screen::new(80, 24);
    decode(&mut screen, b"\x1b[31mred\x1b[0mplain");
    let line = screen.line(0).unwrap();
    assert_eq!(line.cell(0).unwrap().style().fg, Color::Idx4(1));
    assert_eq!(line.cell(3).unwrap().style().fg, Color::Default);
}

#[test]
fn da_query_queues_the_vt100_reply() {
    let mut screen = Screen::new(80, 24);
    let mut decoder = decode(&mut screen, b"\x1b[c");
    assert_eq!(decoder.drain_replies(), b"\x1b[?1;2c");
    assert!(decoder.drain_replies().is_empty());
}

#[test]
fn erase_line_and_page_commands() {
    let mut screen = Screen::new(10, 3);
    decode(&mut screen, b"abcdef\x1b[3G\x1b[K");
    assert_eq!(row(&screen, 0), "ab    ");

    let mut screen = Screen::new(10, 3);
    decode(&mut screen, b"abcdef\x1b[3G\x1b[1K");
    assert_eq!(row(&screen, 0), "   def");

    let mut screen = Screen::new(10, 3);
    decode(&mut screen, b"one\r\ntwo\r\nthree\x1b[2J");
    assert_eq!(row(&screen, 0), "");
    assert_eq!(row(&screen, 1), "");
    assert_eq!(row(&screen, 2), "");
}

#[test]
fn delete_and_erase_characters() {
    let mut screen = Screen::new(10, 3);
    decode(&mut screen, b"abcdef\x1b[2G\x1b[2P");
    assert_eq!(row(&screen, 0), "adef");

    let mut screen = Screen::new(10, 3);
    decode(&mut screen, b"abcdef\x1b[2G\x1b[2X");
    assert_eq!(row(&screen, 0), "a  def");
}

#[test]
fn insert_mode_shifts_instead_of_overwriting() {
    let mut screen = Screen::new(20, 3);
    decode(&mut screen, b"world\r\x1b[4hhello \x1b[4l");
    assert_eq!(row(&screen, 0), "hello world");
    assert!(!screen.modes().insert);
}

#[test]
fn alternate_screen_round_trip_via_1049() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"shell prompt $");
    let saved = screen.cursor_pos();

    decode(&mut screen, b"\x1b[?1049h");
    assert!(screen.modes().alternate_screen);
    decode(&mut screen, b"\x1b[HFULL SCREEN APP");
    assert_eq!(row(&screen, 0), "FULL SCREEN APP");

    decode(&mut screen, b"\x1b[?1049l");
    assert!(!screen.modes().alternate_screen);
    assert_eq!(row(&screen, 0), "shell prompt $");
    assert_eq!(screen.cursor_pos(), saved);
}

#[test]
fn mode_47_swaps_buffers_both_ways() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"primary\x1b[?47h");
    assert!(screen.modes().alternate_screen);
    decode(&mut screen, b"\x1b[Halt");
    decode(&mut screen, b"\x1b[?47l");
    assert!(!screen.modes().alternate_screen);
    assert_eq!(row(&screen, 0), "primary");
    // A second reset must not swap back to the alternate side.
    decode(&mut screen, b"\x1b[?47l");
    assert!(!screen.modes().alternate_screen);
}

#[test]
fn dec_private_mode_flags() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"\x1b[?1h\x1b[?2004h");
    assert!(screen.modes().app_cursor_keys);
    assert!(screen.modes().bracketed_paste);
    decode(&mut screen, b"\x1b[?1l\x1b[?2004l\x1b[?7l");
    assert!(!screen.modes().app_cursor_keys);
    assert!(!screen.modes().bracketed_paste);
    assert!(!screen.modes().autowrap);
}

#[test]
fn cursor_save_restore_via_esc7_esc8_and_1048() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"\x1b[4;4H\x1b7\x1b[H\x1b8");
    assert_eq!(screen.cursor_pos(), Cursor { x: 3, y: 3 });

    decode(&mut screen, b"\x1b[6;6H\x1b[?1048h\x1b[H\x1b[?1048l");
    assert_eq!(screen.cursor_pos(), Cursor { x: 5, y: 5 });
}

#[test]
fn index_nel_and_reverse_index() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"ab\x1bD");
    assert_eq!(screen.cursor_pos(), Cursor { x: 2, y: 1 });
    decode(&mut screen, b"\x1bE");
    assert_eq!(screen.cursor_pos(), Cursor { x: 0, y: 2 });
    decode(&mut screen, b"\x1bM\x1bM\x1bM");
    assert_eq!(screen.cursor_pos(), Cursor { x: 0, y: 0 });
}

#[test]
fn decstbm_is_parsed_and_ignored() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"text\x1b[2;9r");
    assert_eq!(screen.cursor_pos(), Cursor { x: 0, y: 0 });
    assert_eq!(row(&screen, 0), "text");
}

#[test]
fn partial_utf8_across_calls_yields_one_cell() {
    let mut screen = Screen::new(40, 10);
    let mut decoder = Decoder::new();
    decoder.decode_input(&mut screen, b"\xE2\x82");
    // Nothing committed yet; the tail is incomplete.
    assert_eq!(row(&screen, 0), "");
    assert_eq!(screen.cursor_pos(), Cursor { x: 0, y: 0 });
    decoder.decode_input(&mut screen, b"\xAC");
    assert_eq!(row(&screen, 0), "\u{20AC}");
    assert_eq!(screen.cursor_pos().x, 1);
}

#[test]
fn split_escape_sequence_across_calls() {
    let mut screen = Screen::new(40, 10);
    let mut decoder = Decoder::new();
    decoder.decode_input(&mut screen, b"\x1b[5");
    decoder.decode_input(&mut screen, b";3H");
    assert_eq!(screen.cursor_pos(), Cursor { x: 2, y: 4 });
}

#[test]
fn osc_payload_is_swallowed() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"\x1b]0;window title\x07after");
    assert_eq!(row(&screen, 0), "after");
}

#[test]
fn unknown_sequences_degrade_gracefully() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"a\x1b[99zb\x1bQc\x01d");
    // The unknown CSI, the unknown escape, and the stray control byte are
    // all dropped; the printable text survives.
    assert_eq!(row(&screen, 0), "abcd");
}

#[test]
fn charset_selection_and_decaln_are_tolerated() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"\x1b(Bok\x1b[5;5H\x1b#8");
    assert_eq!(row(&screen, 0), "ok");
    assert_eq!(screen.cursor_pos(), Cursor { x: 0, y: 0 });
}

#[test]
fn double_escape_restarts_the_sequence() {
    let mut screen = Screen::new(40, 10);
    decode(&mut screen, b"\x1b\x1b[3;7H");
    assert_eq!(screen.cursor_pos(), Cursor { x: 6, y: 2 });
}

#[test]
fn autowrap_drives_text_onto_the_next_row() {
    let mut screen = Screen::new(4, 5);
    decode(&mut screen, b"abcdef");
    assert_eq!(row(&screen, 0), "abcd");
    assert_eq!(row(&screen, 1), "ef");

    let mut screen = Screen::new(4, 5);
    decode(&mut screen, b"\x1b[?7labcdef");
    assert_eq!(row(&screen, 0), "abcf");
}
