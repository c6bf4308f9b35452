/// Growth niches shown on the dashboard.
pub const CURATED_ITEMS: [&str; 10] = [
    "Portable Power Station",
    "Cold Plunge",
    "Pickleball",
    "Red Light Therapy",
    "Smart Ring",
    "Heat Pump",
    "E-bike",
    "Matcha",
    "Tiny House",
    "Air Purifier",
];

/// Max curated niches in one comparison.
pub const MAX_SELECTED: usize = 6;
/// Max custom products in one comparison.
pub const MAX_CUSTOM: usize = 6;

/// Resolve a comparison: selected niches must be curated, both lists are capped.
pub fn comparison(selected: &[String], custom: &[String]) -> Result<Vec<String>, String> {
    let selected: Vec<&str> = selected
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let custom: Vec<&str> = custom
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if selected.len() > MAX_SELECTED {
        return Err(format!(
            "{} niches selected, at most {} can be compared",
            selected.len(),
            MAX_SELECTED
        ));
    }
    if custom.len() > MAX_CUSTOM {
        return Err(format!(
            "{} custom products given, at most {} can be compared",
            custom.len(),
            MAX_CUSTOM
        ));
    }

    let mut items = Vec::with_capacity(selected.len() + custom.len());

    for name in selected {
        match CURATED_ITEMS
            .iter()
            .find(|item| item.eq_ignore_ascii_case(name))
        {
            Some(item) => items.push(item.to_string()),
            None => return Err(format!("'{}' is not a curated niche", name)),
        }
    }

    items.extend(custom.into_iter().map(String::from));

    if items.is_empty() {
        return Err("nothing to compare, pass --selected or --custom".into());
    }

    Ok(items)
}
