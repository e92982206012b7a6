//! Gremlin traversal text for the similar-documents pivot

use crate::graph::{EntityKind, EntitySelection};

/// Quote a string as a Groovy single-quoted literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '$' => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// `has('name', within(...)).hasLabel(...)` for one entity kind, or `None` if nothing is selected.
fn kind_condition(selection: &EntitySelection, kind: EntityKind) -> Option<String> {
    let names: Vec<String> = selection.names(kind).map(quote).collect();
    if names.is_empty() {
        return None;
    }
    Some(format!(
        "has('name', within({})).hasLabel({})",
        names.join(", "),
        quote(kind.vertex_label())
    ))
}

/// Documents that mention any selected entity, projected with their library and all
/// mentioned entity names grouped by type.
///
/// Returns `None` for an empty selection.
pub fn similar_documents_query(selection: &EntitySelection) -> Option<String> {
    let conditions: Vec<String> = EntityKind::ALL
        .iter()
        .filter_map(|kind| kind_condition(selection, *kind))
        .collect();
    if conditions.is_empty() {
        return None;
    }

    Some(format!(
        "g.V().hasLabel('document')\
         .where(out('mentions').or({}))\
         .project('document', 'library', 'matched_entities')\
         .by('name')\
         .by(out('belongs_to').values('name'))\
         .by(out('mentions').group().by('type').by(values('name').fold()))",
        conditions.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_groovy_specials() {
        assert_eq!(quote("Makati"), "'Makati'");
        assert_eq!(quote("O'Neil"), r"'O\'Neil'");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
        assert_eq!(quote("line\nbreak"), r"'line\nbreak'");
    }

    #[test]
    fn test_empty_selection_has_no_query() {
        assert!(similar_documents_query(&EntitySelection::new()).is_none());
    }

    #[test]
    fn test_single_kind_query() {
        let mut selection = EntitySelection::new();
        selection.select(EntityKind::Organization, "Ayala Land");
        let query = similar_documents_query(&selection).unwrap();

        assert_eq!(
            query,
            "g.V().hasLabel('document')\
             .where(out('mentions').or(has('name', within('Ayala Land')).hasLabel('organization')))\
             .project('document', 'library', 'matched_entities')\
             .by('name')\
             .by(out('belongs_to').values('name'))\
             .by(out('mentions').group().by('type').by(values('name').fold()))"
        );
    }

    #[test]
    fn test_conditions_follow_kind_order() {
        let mut selection = EntitySelection::new();
        selection.select(EntityKind::Location, "Cebu");
        selection.select(EntityKind::Person, "Ben Reyes");
        selection.select(EntityKind::Person, "Ana Cruz");
        let query = similar_documents_query(&selection).unwrap();

        let people = query.find("hasLabel('peopl')").unwrap();
        let places = query.find("hasLabel('location')").unwrap();
        assert!(people < places);
        assert!(query.contains("within('Ana Cruz', 'Ben Reyes')"));
        assert!(!query.contains("hasLabel('organization')"));
    }

    #[test]
    fn test_hostile_names_stay_inside_literals() {
        let mut selection = EntitySelection::new();
        selection.select(EntityKind::Person, "x')).drop().V().has('a");
        let query = similar_documents_query(&selection).unwrap();
        assert!(query.contains(r"within('x\')).drop().V().has(\'a')"));
    }
}
