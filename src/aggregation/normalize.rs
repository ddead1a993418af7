use crate::types::{Row, Value};

use super::transport::DetailPayload;

/// Remote stat names and the row keys they land in.
const STAT_NAMES: [(&str, &str); 6] = [
    ("hp", "hp"),
    ("attack", "attack"),
    ("defense", "defense"),
    ("special-attack", "specialAttack"),
    ("special-defense", "specialDefense"),
    ("speed", "speed"),
];

/// Flatten a detail payload into a row.
///
/// Missing stats read as 0. Exactly two types are joined with `" / "`; any other non-empty
/// list keeps only the first type name.
pub fn normalize(detail: &DetailPayload) -> Row {
    let mut row = Row::new(detail.id)
        .with(
            "sprite",
            detail.sprites.front_default.clone().unwrap_or_default(),
        )
        .with("name", detail.name.as_str())
        .with("types", join_types(detail));

    for (remote, key) in STAT_NAMES {
        let stat = detail
            .stats
            .iter()
            .find(|s| s.stat.name == remote)
            .map(|s| s.base_stat)
            .unwrap_or(0);
        row.set(key, Value::from(stat));
    }

    let ability = detail
        .abilities
        .first()
        .map(|a| a.ability.name.clone())
        .unwrap_or_default();
    row.with("ability", ability)
}

fn join_types(detail: &DetailPayload) -> String {
    match detail.types.as_slice() {
        [a, b] => format!("{} / {}", a.kind.name, b.kind.name),
        [first, ..] => first.kind.name.clone(),
        [] => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize;
    use crate::aggregation::transport::DetailPayload;
    use crate::types::Value;

    fn payload(json: &str) -> DetailPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn flattens_stats_types_and_sprite() {
        let row = normalize(&payload(
            r#"{"id":6,"name":"charizard",
               "sprites":{"front_default":"https://img/6.png"},
               "types":[{"type":{"name":"fire"}},{"type":{"name":"flying"}}],
               "stats":[{"base_stat":78,"stat":{"name":"hp"}},
                        {"base_stat":109,"stat":{"name":"special-attack"}},
                        {"base_stat":85,"stat":{"name":"special-defense"}}],
               "abilities":[{"ability":{"name":"blaze"}},{"ability":{"name":"solar-power"}}]}"#,
        ));

        assert_eq!(row.id(), 6);
        assert_eq!(row.get("types"), Some(Value::text("fire / flying")));
        assert_eq!(row.get("sprite"), Some(Value::text("https://img/6.png")));
        assert_eq!(row.get("hp"), Some(Value::Number(78.0)));
        assert_eq!(row.get("specialAttack"), Some(Value::Number(109.0)));
        assert_eq!(row.get("specialDefense"), Some(Value::Number(85.0)));
        assert_eq!(row.get("speed"), Some(Value::Number(0.0)));
        assert_eq!(row.get("ability"), Some(Value::text("blaze")));
    }

    #[test]
    fn sparse_payload_gets_defaults() {
        let row = normalize(&payload(r#"{"id":10001,"name":"deoxys-attack"}"#));
        assert_eq!(row.get("types"), Some(Value::text("")));
        assert_eq!(row.get("sprite"), Some(Value::text("")));
        assert_eq!(row.get("ability"), Some(Value::text("")));
        assert_eq!(row.get("attack"), Some(Value::Number(0.0)));
    }

    #[test]
    fn more_than_two_types_keeps_only_the_first() {
        let row = normalize(&payload(
            r#"{"id":1,"name":"x","types":[{"type":{"name":"a"}},{"type":{"name":"b"}},{"type":{"name":"c"}}]}"#,
        ));
        assert_eq!(row.get("types"), Some(Value::text("a")));
    }

    #[test]
    fn single_type_is_used_as_is() {
        let row = normalize(&payload(r#"{"id":25,"name":"pikachu","types":[{"type":{"name":"electric"}}]}"#));
        assert_eq!(row.get("types"), Some(Value::text("electric")));
    }
}
