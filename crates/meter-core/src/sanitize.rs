//! Filesystem-safe name normalization.

/// Normalize arbitrary text into a filesystem-safe token.
///
/// Latin accents are folded to their ASCII base letter, whitespace runs
/// collapse to a single `_`, and anything outside `[A-Za-z0-9._-]` is
/// dropped. Pure, no side effects.
pub fn sanitize_filename(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_separator = false;

    let mut push = |out: &mut String, ch: char, pending: &mut bool| {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            if *pending && !out.is_empty() {
                out.push('_');
            }
            *pending = false;
            out.push(ch);
        }
    };

    for ch in input.chars() {
        if ch.is_whitespace() {
            pending_separator = true;
            continue;
        }
        match fold_accent(ch) {
            Some(folded) => {
                for c in folded.chars() {
                    push(&mut out, c, &mut pending_separator);
                }
            }
            None => push(&mut out, ch, &mut pending_separator),
        }
    }

    out
}

/// Fold a Latin-1/Latin Extended-A accented character to its ASCII base.
fn fold_accent(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => "E",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' => "I",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => "O",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' => "U",
        'ç' | 'ć' | 'ĉ' | 'č' => "c",
        'Ç' | 'Ć' | 'Ĉ' | 'Č' => "C",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}
