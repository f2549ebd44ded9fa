/*!
 * Heuristic sentence splitting.
 *
 * Splits a block of text into sentence spans on terminal punctuation followed
 * by whitespace or the end of the text. Whitespace after a boundary stays on
 * the preceding span so the spans always concatenate back to the input.
 */

/// Iterator over the sentence spans of a text
#[derive(Debug, Clone)]
pub struct SentenceSplitter<'a> {
    text: &'a str,
    pos: usize,
}

/// Split `text` into sentence spans
pub fn split(text: &str) -> SentenceSplitter<'_> {
    SentenceSplitter { text, pos: 0 }
}

impl<'a> Iterator for SentenceSplitter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.text;
        if self.pos >= text.len() {
            return None;
        }
        let start = self.pos;
        let end = find_boundary(text, start).unwrap_or(text.len());
        self.pos = end;
        Some(&text[start..end])
    }
}

impl std::iter::FusedIterator for SentenceSplitter<'_> {}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…') || is_full_width_terminal(c)
}

fn is_full_width_terminal(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

fn is_closer(c: char) -> bool {
    matches!(
        c,
        '"' | '\'' | ')' | ']' | '}' | '»' | '”' | '’' | '」' | '』' | '）'
    )
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Byte offset where the sentence starting at `from` ends, if it ends early
fn find_boundary(text: &str, from: usize) -> Option<usize> {
    let mut idx = from;
    while let Some(c) = text[idx..].chars().next() {
        idx += c.len_utf8();
        if !is_terminal(c) {
            continue;
        }

        let mut full_width = is_full_width_terminal(c);
        while let Some(next) = text[idx..].chars().next() {
            if is_terminal(next) || is_closer(next) {
                full_width |= is_full_width_terminal(next);
                idx += next.len_utf8();
            } else {
                break;
            }
        }

        let ws_end = skip_whitespace(text, idx);
        if ws_end == text.len() {
            return Some(text.len());
        }
        if ws_end == idx {
            if full_width {
                return Some(idx);
            }
            continue;
        }
        match text[ws_end..].chars().next() {
            Some(next) if next.is_lowercase() && !full_width => continue,
            _ => return Some(ws_end),
        }
    }
    None
}
