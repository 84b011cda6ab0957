/// Collapse raw OCR output into paragraph-structured text.
///
/// Consecutive non-blank lines form one paragraph, each line trimmed and
/// joined with single spaces. Any run of blank lines becomes exactly one
/// paragraph break; the trailing partial paragraph is flushed. Idempotent.
pub fn normalize(raw: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(trimmed);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}
