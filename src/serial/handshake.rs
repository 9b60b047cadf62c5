//! # Pairing Handshake
//!
//! Pairs with the remote board before it starts streaming samples.
//!
//! ## Sequence
//!
//! ```text
//! AwaitingGreeting ──(greeting line)──▶ AwaitingPairCode ──(code line)──▶ Paired
//!                                       (after a dwell)                  └─ writes "PAIRING_OK\r\n"
//! ```
//!
//! ## Framing
//!
//! Informational lines are framed on their escaped byte-literal rendering,
//! `b'` through the escaped terminator and closing quote. Marker widths count
//! characters of that rendering:
//!
//! | Line | Leading marker | Trailing marker | Wire equivalent for a CRLF line |
//! |------|----------------|-----------------|---------------------------------|
//! | Greeting | 2 (`b'`) | 5 (`\r\n'`) | the whole line |
//! | Pair code | 18 | 5 | everything after the first 16 bytes |
//!
//! A line too short to hold both markers is rejected instead of being sliced
//! into a truncated code.

use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use super::port_trait::LineLink;
use crate::error::{Result, WheelError};

/// Acknowledgment that switches the board into data mode
pub const PAIRING_ACK: &[u8] = b"PAIRING_OK\r\n";

/// Default wait between the greeting and the pair code line
pub const DEFAULT_PAIR_CODE_DWELL: Duration = Duration::from_secs(5);

/// Renders bytes as an escaped byte literal, e.g. `b'42\r\n'`.
///
/// Printable ASCII is kept, `\t`, `\n`, `\r` and the backslash are escaped,
/// everything else becomes `\xNN`. Single quotes delimit the literal unless
/// the bytes contain `'` but no `"`.
///
/// # Examples
///
/// ```
/// use wheel_bridge::serial::handshake::byte_literal;
///
/// assert_eq!(byte_literal(b"42\r\n"), r"b'42\r\n'");
/// assert_eq!(byte_literal(b"it's"), r#"b"it's""#);
/// ```
pub fn byte_literal(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(bytes.len() + 3);
    out.push('b');
    out.push(quote);
    for &byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if char::from(b) == quote => {
                out.push('\\');
                out.push(quote);
            }
            0x20..=0x7e => out.push(char::from(byte)),
            _ => out.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    out.push(quote);
    out
}

/// Line with fixed-width leading and trailing markers around its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWidthFrame {
    /// Name used in error messages
    pub name: &'static str,
    /// Leading marker width, `b'` included
    pub prefix_len: usize,
    /// Trailing marker width, escaped terminator and closing quote included
    pub suffix_len: usize,
}

/// Greeting line sent when the board boots
pub const GREETING_FRAME: FixedWidthFrame = FixedWidthFrame {
    name: "greeting",
    prefix_len: 2,
    suffix_len: 5,
};

/// Line announcing the pair code
pub const PAIR_CODE_FRAME: FixedWidthFrame = FixedWidthFrame {
    name: "pair code",
    prefix_len: 18,
    suffix_len: 5,
};

impl FixedWidthFrame {
    /// Shortest rendering that holds both markers.
    #[must_use]
    pub const fn min_len(&self) -> usize {
        self.prefix_len + self.suffix_len
    }

    /// Returns the body between the markers of `line`'s byte-literal rendering.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if the rendering is shorter than [`Self::min_len`].
    ///
    /// # Examples
    ///
    /// ```
    /// use wheel_bridge::serial::handshake::{GREETING_FRAME, PAIR_CODE_FRAME};
    ///
    /// assert_eq!(GREETING_FRAME.extract("Hello\r\n")?, "Hello");
    /// assert_eq!(PAIR_CODE_FRAME.extract("ABCDEFGHIJKLMNOP1234\r\n")?, "1234");
    /// assert!(PAIR_CODE_FRAME.extract("1234\r\n").is_err());
    /// # Ok::<(), wheel_bridge::error::WheelError>(())
    /// ```
    pub fn extract(&self, line: &str) -> Result<String> {
        let rendered = byte_literal(line.as_bytes());
        if rendered.len() < self.min_len() {
            return Err(WheelError::Protocol(format!(
                "{} line too short: {} characters rendered, need at least {} ({})",
                self.name,
                rendered.len(),
                self.min_len(),
                rendered
            )));
        }

        // Rendering is pure ASCII, so any index is a char boundary
        Ok(rendered[self.prefix_len..rendered.len() - self.suffix_len].to_string())
    }
}

/// Outcome of a completed handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    /// Greeting body, if its framing was intact
    pub greeting: Option<String>,
    pub pair_code: String,
}

/// Handshake progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingGreeting,
    AwaitingPairCode { greeting: Option<String> },
    Paired(Pairing),
}

/// One-shot pairing state machine
#[derive(Debug)]
pub struct PairingHandshake {
    state: HandshakeState,
    pair_code_dwell: Duration,
}

impl Default for PairingHandshake {
    fn default() -> Self {
        Self::new(DEFAULT_PAIR_CODE_DWELL)
    }
}

impl PairingHandshake {
    #[must_use]
    pub fn new(pair_code_dwell: Duration) -> Self {
        Self {
            state: HandshakeState::AwaitingGreeting,
            pair_code_dwell,
        }
    }

    #[must_use]
    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    /// Consumes the greeting line and moves to `AwaitingPairCode`.
    ///
    /// The greeting is informational, so a malformed one is logged and the
    /// transition happens anyway.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if the greeting was already consumed.
    pub fn accept_greeting(&mut self, line: &str) -> Result<()> {
        if self.state != HandshakeState::AwaitingGreeting {
            return Err(WheelError::Protocol(format!(
                "greeting received in state {:?}",
                self.state
            )));
        }

        let greeting = match GREETING_FRAME.extract(line) {
            Ok(body) => {
                info!("{}", body);
                Some(body)
            }
            Err(e) => {
                warn!("Unexpected greeting framing: {}", e);
                None
            }
        };

        self.state = HandshakeState::AwaitingPairCode { greeting };
        Ok(())
    }

    /// Extracts the pair code and moves to `Paired`.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if called out of order, if the line is too short for
    /// its markers, or if the code between them is blank.
    pub fn accept_pair_code(&mut self, line: &str) -> Result<Pairing> {
        let greeting = match &self.state {
            HandshakeState::AwaitingPairCode { greeting } => greeting.clone(),
            other => {
                return Err(WheelError::Protocol(format!(
                    "pair code received in state {:?}",
                    other
                )));
            }
        };

        let code = PAIR_CODE_FRAME.extract(line)?;
        if code.trim().is_empty() {
            return Err(WheelError::Protocol(format!(
                "pair code line carries no code ({:?})",
                line
            )));
        }

        info!("Paircode found! {}", code);
        let pairing = Pairing {
            greeting,
            pair_code: code,
        };
        self.state = HandshakeState::Paired(pairing.clone());
        Ok(pairing)
    }

    /// Runs the whole handshake over `link` and acknowledges the pairing.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` for framing problems and the link's error for I/O
    /// failures.
    pub async fn perform<L: LineLink + ?Sized>(mut self, link: &mut L) -> Result<Pairing> {
        let greeting = link.read_line().await?;
        self.accept_greeting(&greeting)?;

        sleep(self.pair_code_dwell).await;

        let code_line = link.read_line().await?;
        let pairing = self.accept_pair_code(&code_line)?;

        link.write_all(PAIRING_ACK).await?;
        info!("Pairing handshake done.");

        Ok(pairing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::port_trait::mocks::MockLineLink;
    use crate::serial::port_trait::StreamLink;
    use tokio_test::io::Builder;

    const GREETING: &str = "WheelDriver v1.0\r\n";
    // "PAIRING CODE >> " is 16 bytes on the wire
    const CODE_LINE: &str = "PAIRING CODE >> 4711\r\n";

    // ==================== Byte Literal Tests ====================

    #[test]
    fn test_byte_literal_escapes() {
        assert_eq!(byte_literal(b""), "b''");
        assert_eq!(byte_literal(b"4711\r\n"), r"b'4711\r\n'");
        assert_eq!(byte_literal(b"a\tb\\c"), r"b'a\tb\\c'");
        assert_eq!(byte_literal(&[0x00, 0x7f, 0xc3, 0xa9]), r"b'\x00\x7f\xc3\xa9'");
    }

    #[test]
    fn test_byte_literal_quote_selection() {
        assert_eq!(byte_literal(b"it's"), r#"b"it's""#);
        assert_eq!(byte_literal(b"say \"hi\""), r#"b'say "hi"'"#);
        assert_eq!(byte_literal(b"'\""), r#"b'\'"'"#);
    }

    // ==================== Frame Tests ====================

    #[test]
    fn test_frame_widths() {
        assert_eq!(GREETING_FRAME.prefix_len, 2);
        assert_eq!(GREETING_FRAME.suffix_len, 5);
        assert_eq!(PAIR_CODE_FRAME.prefix_len, 18);
        assert_eq!(PAIR_CODE_FRAME.suffix_len, 5);
        assert_eq!(PAIR_CODE_FRAME.min_len(), 23);
    }

    #[test]
    fn test_extract_slices_the_rendered_line() {
        // b'WheelDriver ready\r\n'[2:-5]
        assert_eq!(GREETING_FRAME.extract("WheelDriver ready\r\n").unwrap(), "WheelDriver ready");
        assert_eq!(GREETING_FRAME.extract(GREETING).unwrap(), "WheelDriver v1.0");

        // b'ABCDEFGHIJKLMNOP1234\r\n'[18:-5]
        assert_eq!(PAIR_CODE_FRAME.extract("ABCDEFGHIJKLMNOP1234\r\n").unwrap(), "1234");
        assert_eq!(PAIR_CODE_FRAME.extract(CODE_LINE).unwrap(), "4711");
    }

    #[test]
    fn test_extract_without_crlf_follows_rendering() {
        // b'ABCDEFGHIJKLMNOP1234\n'[18:-5] loses two digits
        assert_eq!(PAIR_CODE_FRAME.extract("ABCDEFGHIJKLMNOP1234\n").unwrap(), "12");
    }

    #[test]
    fn test_extract_minimum_length_gives_empty_body() {
        let line = "ABCDEFGHIJKLMNOP\r\n";
        assert_eq!(byte_literal(line.as_bytes()).len(), PAIR_CODE_FRAME.min_len());
        assert_eq!(PAIR_CODE_FRAME.extract(line).unwrap(), "");
    }

    #[test]
    fn test_extract_short_line_fails() {
        match PAIR_CODE_FRAME.extract("CODE 4711\r\n") {
            Err(WheelError::Protocol(msg)) => assert!(msg.contains("too short")),
            other => panic!("Expected Protocol error, got: {:?}", other),
        }
        // Timed-out read renders as b''
        assert!(GREETING_FRAME.extract("").is_err());
        assert!(PAIR_CODE_FRAME.extract("").is_err());
    }

    #[test]
    fn test_extract_escapes_non_ascii() {
        assert_eq!(GREETING_FRAME.extract("é\r\n").unwrap(), r"\xc3\xa9");
    }

    // ==================== State Machine Tests ====================

    #[test]
    fn test_state_transitions() {
        let mut handshake = PairingHandshake::new(Duration::ZERO);
        assert_eq!(handshake.state(), &HandshakeState::AwaitingGreeting);

        handshake.accept_greeting(GREETING).unwrap();
        assert_eq!(
            handshake.state(),
            &HandshakeState::AwaitingPairCode {
                greeting: Some("WheelDriver v1.0".to_string())
            }
        );

        let pairing = handshake.accept_pair_code(CODE_LINE).unwrap();
        assert_eq!(pairing.pair_code, "4711");
        assert_eq!(handshake.state(), &HandshakeState::Paired(pairing));
    }

    #[test]
    fn test_malformed_greeting_still_advances() {
        let mut handshake = PairingHandshake::default();
        handshake.accept_greeting("").unwrap();
        assert_eq!(
            handshake.state(),
            &HandshakeState::AwaitingPairCode { greeting: None }
        );
    }

    #[test]
    fn test_transitions_are_one_directional() {
        let mut handshake = PairingHandshake::new(Duration::ZERO);
        assert!(handshake.accept_pair_code(CODE_LINE).is_err());

        handshake.accept_greeting(GREETING).unwrap();
        assert!(handshake.accept_greeting(GREETING).is_err());

        handshake.accept_pair_code(CODE_LINE).unwrap();
        assert!(handshake.accept_pair_code(CODE_LINE).is_err());
        assert!(handshake.accept_greeting(GREETING).is_err());
    }

    #[test]
    fn test_short_pair_code_line_fails() {
        let mut handshake = PairingHandshake::new(Duration::ZERO);
        handshake.accept_greeting(GREETING).unwrap();

        assert!(matches!(
            handshake.accept_pair_code("4711\r\n"),
            Err(WheelError::Protocol(_))
        ));
        // Still waiting for a usable code
        assert!(matches!(
            handshake.state(),
            HandshakeState::AwaitingPairCode { .. }
        ));
    }

    #[test]
    fn test_blank_pair_code_fails() {
        let mut handshake = PairingHandshake::new(Duration::ZERO);
        handshake.accept_greeting(GREETING).unwrap();
        assert!(handshake
            .accept_pair_code("PAIRING CODE >>     \r\n")
            .is_err());
    }

    // ==================== Link Tests ====================

    #[tokio::test]
    async fn test_perform_writes_ack() {
        let mut link = MockLineLink::new([GREETING, CODE_LINE, "123\n"]);

        let pairing = PairingHandshake::new(Duration::ZERO)
            .perform(&mut link)
            .await
            .unwrap();

        assert_eq!(pairing.greeting.as_deref(), Some("WheelDriver v1.0"));
        assert_eq!(pairing.pair_code, "4711");
        assert_eq!(link.get_written_data(), vec![b"PAIRING_OK\r\n".to_vec()]);
        // Data lines are left for the caller
        assert_eq!(link.remaining_lines(), 1);
    }

    #[tokio::test]
    async fn test_perform_over_byte_stream() {
        let stream = Builder::new()
            .read(GREETING.as_bytes())
            .read(CODE_LINE.as_bytes())
            .write(PAIRING_ACK)
            .build();
        let mut link = StreamLink::new(stream, Duration::from_secs(1));

        let pairing = PairingHandshake::new(Duration::ZERO)
            .perform(&mut link)
            .await
            .unwrap();
        assert_eq!(pairing.pair_code, "4711");
    }

    #[tokio::test]
    async fn test_perform_timeout_on_pair_code_is_protocol_error() {
        // A timed-out read yields an empty line
        let mut link = MockLineLink::new([GREETING, ""]);

        let result = PairingHandshake::new(Duration::ZERO).perform(&mut link).await;
        assert!(matches!(result, Err(WheelError::Protocol(_))));
        assert!(link.get_written_data().is_empty());
    }

    #[tokio::test]
    async fn test_perform_link_closed() {
        let mut link = MockLineLink::new([GREETING]);
        let result = PairingHandshake::new(Duration::ZERO).perform(&mut link).await;
        assert!(matches!(result, Err(WheelError::LinkClosed)));
    }
}
