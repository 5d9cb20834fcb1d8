//=====================================================
// File: io.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Console seams for OUT/OUTQ, PAUSE and BREAKPOINT
//=====================================================

use std::io::{self, BufRead, Write};

/// Receives text the machine prints.
pub trait TextOutput: Send {
    /// `text` is written as-is, without adding a newline.
    fn write_text(&mut self, text: &str);

    fn write_line(&mut self, line: &str) {
        self.write_text(line);
        self.write_text("\n");
    }
}

/// Source of single keystrokes for PAUSE.
pub trait KeyReader: Send {
    /// `None` once input is exhausted.
    fn read_char(&mut self) -> Option<char>;
}

#[derive(Debug, Default)]
pub struct StdoutOutput;

impl TextOutput for StdoutOutput {
    fn write_text(&mut self, text: &str) {
        let mut stdout = io::stdout().lock();
        // Write failures are ignored.
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Reads a line from stdin and hands back its first character. Terminals in
/// cooked mode only deliver input after Enter.
#[derive(Debug, Default)]
pub struct StdinKeyReader;

impl KeyReader for StdinKeyReader {
    fn read_char(&mut self) -> Option<char> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.chars().next().unwrap_or('\n')),
        }
    }
}

//=====================================================
// End of file
//=====================================================
