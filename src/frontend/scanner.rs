// scanner to scan characters from source code
pub struct Scanner {
    chars: Vec<char>,

    pub current: usize, // current index into chars

    // for diagnostics, position of the next character to read
    line: usize,   // line in source, starting at 1
    column: usize, // character position on current line, starting at 1

    // position before the last advance, for a single unread
    previous: Option<(usize, usize)>,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            current: 0,
            line: 1,
            column: 1,
            previous: None,
        }
    }

    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    // is current position at or after the end of the source
    pub fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    // consume current character, return it and advance
    pub fn advance(&mut self) -> Option<char> {
        if self.is_at_end() {
            return None;
        }

        let c = self.chars[self.current];

        self.previous = Some((self.line, self.column));
        self.current += 1;

        // after a new line the next character is column 1
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    // push the last advanced character back. only one level of pushback is kept
    pub fn unread(&mut self) -> bool {
        match self.previous.take() {
            Some((line, column)) => {
                self.current -= 1;
                self.line = line;
                self.column = column;
                true
            }
            None => false,
        }
    }

    // peek current character (if there is any) without advancing
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.current).copied()
    }

    // advance if and only if current character is equal to expected. return if advanced
    pub fn advance_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }

        false
    }

    pub fn get_lexeme(&self, start: usize, end: usize) -> String {
        self.chars[start..end.min(self.chars.len())].iter().collect()
    }
}
