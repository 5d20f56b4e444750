//! camelCase <-> CONSTANT_CASE conversion used for the wire spelling of
//! roles, states and flags.

/// `comboBoxMenuButton` -> `COMBO_BOX_MENU_BUTTON`
pub fn to_const_case(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, ch) in camel.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_uppercase());
    }
    out
}

/// `COMBO_BOX_MENU_BUTTON` -> `comboBoxMenuButton`
pub fn to_camel_case(constant: &str) -> String {
    let mut out = String::with_capacity(constant.len());
    for (i, word) in constant.split('_').filter(|w| !w.is_empty()).enumerate() {
        let lower = word.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
