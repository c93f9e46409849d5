/// Split `text` into overlapping windows of `chunk_size` chars.
///
/// Windows start every `chunk_size - overlap` chars, so consecutive chunks
/// share `overlap` chars of context; the final chunk may be shorter. Counts
/// chars rather than bytes so multi-byte text never splits mid-character.
///
/// Requires `overlap < chunk_size`.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    assert!(
        overlap < chunk_size,
        "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
    );

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let step = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + chunk_size).min(len);
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }

    chunks
}
