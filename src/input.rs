use std::io::{self, Read};

use tracing::trace;

const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

const fn ctrl(key: u8) -> u8 {
    key ^ 0x40
}

/// A logical edit or navigation request decoded from terminal input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    InsertChar(char),
    MoveToStart,
    MoveToEnd,
    MoveLeft,
    MoveRight,
    MoveWordBackward,
    MoveWordForward,
    SelectPrevious,
    SelectNext,
    DeleteForward,
    DeleteBackward,
    DeleteToEnd,
    DeleteToStart,
    DeleteWordBackward,
    DeleteWordForward,
    PageBackward,
    PageForward,
    Accept,
    Cancel,
    /// Recognised but meaningless input; the caller just repaints.
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    #[default]
    Normal,
    GotEscape,
    GotCsi,
    /// `ESC [ <digit>` waiting for its `~` terminator.
    GotCsiDigit(u8),
    /// Partial multi-byte UTF-8 character.
    GotUtf8 {
        bytes: [u8; 4],
        filled: u8,
        expected: u8,
    },
}

/// Pure transition function: one byte in, next state and possibly a command out.
pub fn advance(state: DecoderState, byte: u8) -> (DecoderState, Option<Command>) {
    use DecoderState::*;

    match state {
        Normal => normal(byte),
        GotEscape => match byte {
            b'[' => (GotCsi, None),
            _ => (Normal, Some(escaped(byte))),
        },
        GotCsi => match byte {
            b'1'..=b'8' => (GotCsiDigit(byte), None),
            _ => (Normal, Some(csi_final(byte))),
        },
        // The trailing byte is consumed whatever it is.
        GotCsiDigit(digit) => (Normal, Some(csi_digit(digit))),
        GotUtf8 {
            mut bytes,
            filled,
            expected,
        } => {
            if byte & 0xc0 != 0x80 {
                // Truncated sequence: drop it and decode this byte afresh.
                let (state, command) = normal(byte);
                return (state, command.or(Some(Command::Noop)));
            }
            bytes[filled as usize] = byte;
            let filled = filled + 1;
            if filled < expected {
                return (
                    GotUtf8 {
                        bytes,
                        filled,
                        expected,
                    },
                    None,
                );
            }
            let command = std::str::from_utf8(&bytes[..filled as usize])
                .ok()
                .and_then(|text| text.chars().next())
                .map_or(Command::Noop, Command::InsertChar);
            (Normal, Some(command))
        }
    }
}

fn normal(byte: u8) -> (DecoderState, Option<Command>) {
    let command = match byte {
        ESC => return (DecoderState::GotEscape, None),
        0xc2..=0xdf => return (utf8_start(byte, 2), None),
        0xe0..=0xef => return (utf8_start(byte, 3), None),
        0xf0..=0xf4 => return (utf8_start(byte, 4), None),
        0x20..=0x7e => Command::InsertChar(byte as char),
        _ if byte == ctrl(b'A') => Command::MoveToStart,
        _ if byte == ctrl(b'E') => Command::MoveToEnd,
        _ if byte == ctrl(b'B') => Command::MoveLeft,
        _ if byte == ctrl(b'F') || byte == ctrl(b'I') => Command::MoveRight,
        _ if byte == ctrl(b'P') => Command::SelectPrevious,
        _ if byte == ctrl(b'N') => Command::SelectNext,
        _ if byte == ctrl(b'D') => Command::DeleteForward,
        _ if byte == ctrl(b'H') || byte == DEL => Command::DeleteBackward,
        _ if byte == ctrl(b'K') => Command::DeleteToEnd,
        _ if byte == ctrl(b'U') => Command::DeleteToStart,
        _ if byte == ctrl(b'W') => Command::DeleteWordBackward,
        _ if byte == ctrl(b'V') => Command::PageBackward,
        _ if byte == ctrl(b'C') => Command::Cancel,
        _ if byte == ctrl(b'M')
            || byte == ctrl(b'J')
            || byte == ctrl(b']')
            || byte == ctrl(b'\\') =>
        {
            Command::Accept
        }
        _ => Command::Noop,
    };
    (DecoderState::Normal, Some(command))
}

fn utf8_start(lead: u8, expected: u8) -> DecoderState {
    DecoderState::GotUtf8 {
        bytes: [lead, 0, 0, 0],
        filled: 1,
        expected,
    }
}

fn escaped(byte: u8) -> Command {
    match byte {
        // Terminals cannot tell a lone Escape apart from a sequence, so it takes two.
        ESC => Command::Cancel,
        b'b' => Command::MoveWordBackward,
        b'f' => Command::MoveWordForward,
        b'd' => Command::DeleteWordForward,
        b'v' => Command::PageForward,
        DEL => Command::DeleteWordBackward,
        _ if byte == ctrl(b'H') => Command::DeleteWordBackward,
        _ => Command::Noop,
    }
}

fn csi_final(byte: u8) -> Command {
    match byte {
        b'A' | b'Z' => Command::SelectPrevious,
        b'B' => Command::SelectNext,
        b'C' => Command::MoveRight,
        b'D' => Command::MoveLeft,
        b'H' => Command::MoveToStart,
        b'F' => Command::MoveToEnd,
        _ => Command::Noop,
    }
}

fn csi_digit(digit: u8) -> Command {
    match digit {
        b'1' | b'7' => Command::MoveToStart,
        b'3' => Command::DeleteForward,
        b'4' | b'8' => Command::MoveToEnd,
        b'5' => Command::PageBackward,
        b'6' => Command::PageForward,
        // Insert
        _ => Command::Noop,
    }
}

/// Stateful wrapper around [`advance`] that pulls bytes from a reader.
#[derive(Debug, Default)]
pub struct InputDecoder {
    state: DecoderState,
}

impl InputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, byte: u8) -> Option<Command> {
        let (state, command) = advance(self.state, byte);
        trace!(byte, ?state, ?command, "decoded input byte");
        self.state = state;
        command
    }

    /// Blocks until one command is decoded. `None` means the input ended.
    pub fn read_command<R: Read>(&mut self, reader: &mut R) -> io::Result<Option<Command>> {
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    if let Some(command) = self.feed(byte[0]) {
                        return Ok(Some(command));
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<Command> {
        let mut decoder = InputDecoder::new();
        let mut reader = bytes;
        let mut commands = Vec::new();
        while let Some(command) = decoder.read_command(&mut reader).unwrap() {
            commands.push(command);
        }
        commands
    }

    #[test]
    fn printable_bytes_insert() {
        assert_eq!(
            decode_all(b"a Z~"),
            vec![
                Command::InsertChar('a'),
                Command::InsertChar(' '),
                Command::InsertChar('Z'),
                Command::InsertChar('~'),
            ]
        );
    }

    #[test]
    fn control_keys_map_to_commands() {
        let cases = [
            (ctrl(b'A'), Command::MoveToStart),
            (ctrl(b'E'), Command::MoveToEnd),
            (ctrl(b'B'), Command::MoveLeft),
            (ctrl(b'F'), Command::MoveRight),
            (b'\t', Command::MoveRight),
            (ctrl(b'P'), Command::SelectPrevious),
            (ctrl(b'N'), Command::SelectNext),
            (ctrl(b'D'), Command::DeleteForward),
            (ctrl(b'H'), Command::DeleteBackward),
            (DEL, Command::DeleteBackward),
            (ctrl(b'K'), Command::DeleteToEnd),
            (ctrl(b'U'), Command::DeleteToStart),
            (ctrl(b'W'), Command::DeleteWordBackward),
            (ctrl(b'V'), Command::PageBackward),
            (ctrl(b'C'), Command::Cancel),
            (b'\r', Command::Accept),
            (b'\n', Command::Accept),
            (0x1d, Command::Accept),
            (0x1c, Command::Accept),
            (ctrl(b'Y'), Command::Noop),
        ];
        for (byte, expected) in cases {
            assert_eq!(advance(DecoderState::Normal, byte), (DecoderState::Normal, Some(expected)));
        }
    }

    #[test]
    fn arrow_keys_and_shift_tab() {
        assert_eq!(
            decode_all(b"\x1b[A\x1b[B\x1b[C\x1b[D\x1b[Z"),
            vec![
                Command::SelectPrevious,
                Command::SelectNext,
                Command::MoveRight,
                Command::MoveLeft,
                Command::SelectPrevious,
            ]
        );
    }

    #[test]
    fn tilde_sequences_consume_terminator() {
        assert_eq!(
            decode_all(b"\x1b[1~\x1b[7~\x1b[H\x1b[4~\x1b[8~\x1b[F\x1b[3~\x1b[5~\x1b[6~\x1b[2~x"),
            vec![
                Command::MoveToStart,
                Command::MoveToStart,
                Command::MoveToStart,
                Command::MoveToEnd,
                Command::MoveToEnd,
                Command::MoveToEnd,
                Command::DeleteForward,
                Command::PageBackward,
                Command::PageForward,
                Command::Noop,
                Command::InsertChar('x'),
            ]
        );
    }

    #[test]
    fn meta_sequences() {
        assert_eq!(
            decode_all(b"\x1bb\x1bf\x1bd\x1bv\x1b\x7f\x1b\x08"),
            vec![
                Command::MoveWordBackward,
                Command::MoveWordForward,
                Command::DeleteWordForward,
                Command::PageForward,
                Command::DeleteWordBackward,
                Command::DeleteWordBackward,
            ]
        );
    }

    #[test]
    fn double_escape_cancels() {
        assert_eq!(decode_all(b"\x1b\x1b"), vec![Command::Cancel]);
    }

    #[test]
    fn unknown_sequences_are_noops() {
        // ESC [ 9 is not part of the grammar, so its `~` arrives as text.
        assert_eq!(
            decode_all(b"\x1bq\x1b[9~\x1b[Q"),
            vec![
                Command::Noop,
                Command::Noop,
                Command::InsertChar('~'),
                Command::Noop,
            ]
        );
    }

    #[test]
    fn multibyte_characters_arrive_whole() {
        assert_eq!(
            decode_all("é日🦀".as_bytes()),
            vec![
                Command::InsertChar('é'),
                Command::InsertChar('日'),
                Command::InsertChar('🦀'),
            ]
        );
    }

    #[test]
    fn broken_utf8_is_dropped() {
        assert_eq!(
            decode_all(b"\xe6\x97a\x80\xff"),
            vec![Command::InsertChar('a'), Command::Noop, Command::Noop]
        );
    }

    #[test]
    fn partial_sequence_waits_for_more_input() {
        let mut decoder = InputDecoder::new();
        assert_eq!(decoder.feed(ESC), None);
        assert_eq!(decoder.feed(b'['), None);
        assert_eq!(decoder.state, DecoderState::GotCsi);
        assert_eq!(decoder.feed(b'5'), None);
        assert_eq!(decoder.state, DecoderState::GotCsiDigit(b'5'));
        assert_eq!(decoder.feed(b'~'), Some(Command::PageBackward));
        assert_eq!(decoder.state, DecoderState::Normal);
    }

    #[test]
    fn escape_bracket_enters_csi() {
        assert_eq!(advance(DecoderState::GotEscape, b'['), (DecoderState::GotCsi, None));
        assert_eq!(decode_all(b"\x1b[A"), vec![Command::SelectPrevious]);
    }

    #[test]
    fn end_of_input_yields_none() {
        let mut decoder = InputDecoder::new();
        let mut reader: &[u8] = b"\x1b";
        assert_eq!(decoder.read_command(&mut reader).unwrap(), None);
    }
}
