/// Bounded command history, as shown in the interpreter's output pane.

use std::collections::VecDeque;

use chrono::Local;

pub struct Transcript {
    lines: VecDeque<String>,
    limit: usize,
    timestamps: bool,
}

impl Transcript {
    pub fn new(limit: usize) -> Self {
        Transcript {
            lines: VecDeque::new(),
            limit: limit.max(1),
            timestamps: false,
        }
    }

    /// Prefix each line with the local time.
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Append `text`, one entry per line. Oldest entries drop past the limit.
    pub fn push(&mut self, text: &str) {
        let stamp = self
            .timestamps
            .then(|| Local::now().format("%H:%M:%S").to_string());
        for line in text.lines() {
            let entry = match &stamp {
                Some(s) => format!("{} {}", s, line),
                None => line.to_string(),
            };
            self.lines.push_back(entry);
        }
        while self.lines.len() > self.limit {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_drops_oldest() {
        let mut t = Transcript::new(3);
        t.push("a\nb");
        t.push("c");
        t.push("d");
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_timestamps() {
        let mut t = Transcript::new(10).with_timestamps(true);
        t.push("ZVIEW> pwd");
        let line = t.lines().next().unwrap();
        assert!(line.ends_with(" ZVIEW> pwd"), "{}", line);
        assert_eq!(line.len(), "00:00:00 ZVIEW> pwd".len());
        t.clear();
        assert!(t.is_empty());
    }
}
