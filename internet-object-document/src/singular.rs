//! English singularization for inferred schema names: an array property
//! called `children` yields a `$child` schema.

/// The closed list of irregular plurals the inferrer recognises.
const IRREGULARS: &[(&str, &str)] = &[
    ("children", "child"),
    ("people", "person"),
    ("mice", "mouse"),
    ("data", "datum"),
    ("criteria", "criterion"),
    ("analyses", "analysis"),
    ("indices", "index"),
    ("men", "man"),
    ("women", "woman"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
    ("oxen", "ox"),
];

/// Returns the singular form of a plural word, preserving a leading
/// capital. Words that do not look plural come back unchanged.
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    let capitalised = word.chars().next().map(char::is_uppercase).unwrap_or(false);

    let singular = if let Some((_, singular)) = IRREGULARS.iter().find(|(p, _)| *p == lower) {
        (*singular).to_string()
    } else if let Some(stem) = lower.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = lower.strip_suffix("ves") {
        format!("{stem}f")
    } else if ["sses", "xes", "zes", "ches", "shes"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        lower[..lower.len() - 2].to_string()
    } else if lower.ends_with('s') && !lower.ends_with("ss") {
        lower[..lower.len() - 1].to_string()
    } else {
        lower
    };

    if capitalised {
        let mut chars = singular.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => singular,
        }
    } else {
        singular
    }
}
