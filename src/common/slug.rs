// src/common/slug.rs

// Tamanho máximo da coluna `workspaces.slug`
pub const MAX_SLUG_LEN: usize = 100;

/// Deriva o slug (URL-safe) de um nome de workspace.
///
/// minúsculas → trim → remove tudo que não é palavra/espaço/hífen →
/// colapsa sequências de espaço/underscore/hífen em um único hífen →
/// remove hífens nas pontas → trunca em 100 caracteres.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();

    let kept: String = lowered
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace() || *c == '-')
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut in_separator = false;
    for c in kept.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            if !in_separator {
                slug.push('-');
                in_separator = true;
            }
        } else {
            slug.push(c);
            in_separator = false;
        }
    }

    slug.trim_matches('-').chars().take(MAX_SLUG_LEN).collect()
}
