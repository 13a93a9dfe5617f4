use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// `{ "value": ... }` wrapper used throughout the ORCID schema.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Wrapped<T> {
    #[serde(default)]
    pub value: Option<T>,
}

// ==============================
// /{id}/person
// ==============================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersonResponse {
    #[serde(default)]
    pub name: Option<PersonName>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersonName {
    #[serde(rename = "given-names", default)]
    pub given_names: Option<Wrapped<String>>,
    #[serde(rename = "family-name", default)]
    pub family_name: Option<Wrapped<String>>,
}

impl PersonResponse {
    /// Given and family names joined by a space, skipping empty parts.
    pub fn full_name(&self) -> Option<String> {
        let name = self.name.as_ref()?;
        let part = |w: &Option<Wrapped<String>>| {
            w.as_ref()
                .and_then(|w| w.value.as_deref())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let joined = [part(&name.given_names), part(&name.family_name)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}

// ==============================
// /{id}/works
// ==============================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorksResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub group: Option<Vec<WorkGroup>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkGroup {
    #[serde(rename = "work-summary", default, deserialize_with = "lenient_list")]
    pub work_summary: Option<Vec<WorkSummary>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkSummary {
    #[serde(rename = "put-code", default)]
    pub put_code: Option<u64>,
    #[serde(default)]
    pub title: Option<WorkTitle>,
    #[serde(rename = "external-ids", default)]
    pub external_ids: Option<ExternalIds>,
    #[serde(rename = "created-date", default)]
    pub created_date: Option<Timestamp>,
    #[serde(rename = "last-modified-date", default)]
    pub last_modified_date: Option<Timestamp>,
}

/// `{ "value": <epoch millis> }`, where the millis may arrive as a number or
/// a numeric string. Anything else reads as no timestamp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Timestamp {
    #[serde(default, deserialize_with = "lenient_millis")]
    pub value: Option<i64>,
}

fn lenient_millis<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(de)? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Decode a list element by element, dropping entries that do not fit `T`.
/// A non-list value reads as absent.
fn lenient_list<'de, D, T>(de: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Option::<serde_json::Value>::deserialize(de)? {
        Some(serde_json::Value::Array(items)) => items,
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(other) => {
            tracing::warn!(kind = json_kind(&other), "orcid.decode.not_a_list");
            return Ok(None);
        }
    };
    let decoded = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "orcid.decode.record_skipped");
                None
            }
        })
        .collect();
    Ok(Some(decoded))
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkTitle {
    #[serde(default)]
    pub title: Option<TitleValue>,
}

/// The nested title is loosely typed in the wild: usually `{"value": "..."}`,
/// sometimes a bare string, occasionally something else entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TitleValue {
    Plain(String),
    Structured { value: Option<String> },
    Other(serde_json::Value),
}

impl<'de> Deserialize<'de> for TitleValue {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match serde_json::Value::deserialize(de)? {
            serde_json::Value::String(s) => Self::Plain(s),
            serde_json::Value::Object(mut map) => Self::Structured {
                value: match map.remove("value") {
                    Some(serde_json::Value::String(s)) => Some(s),
                    _ => None,
                },
            },
            other => Self::Other(other),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalIds {
    #[serde(rename = "external-id", default)]
    pub external_id: Option<Vec<ExternalId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalId {
    #[serde(rename = "external-id-type", default)]
    pub kind: Option<String>,
    #[serde(rename = "external-id-value", default)]
    pub value: Option<String>,
}

impl WorkSummary {
    /// Creation time in epoch millis, falling back to last-modified.
    pub fn effective_millis(&self) -> Option<i64> {
        self.created_date
            .as_ref()
            .and_then(|w| w.value)
            .or_else(|| self.last_modified_date.as_ref().and_then(|w| w.value))
    }

    pub fn title_value(&self) -> Option<&TitleValue> {
        self.title.as_ref().and_then(|t| t.title.as_ref())
    }

    /// Value of the first DOI-typed external id that carries a non-empty value.
    pub fn first_doi(&self) -> Option<&str> {
        self.external_ids
            .as_ref()
            .and_then(|ids| ids.external_id.as_deref())
            .unwrap_or_default()
            .iter()
            .filter(|ext| {
                ext.kind
                    .as_deref()
                    .is_some_and(|k| k.eq_ignore_ascii_case("doi"))
            })
            .find_map(|ext| ext.value.as_deref().filter(|v| !v.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person(v: serde_json::Value) -> PersonResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn full_name_joins_parts() {
        let p = person(json!({
            "name": {
                "given-names": {"value": "Josiah"},
                "family-name": {"value": "Carberry"}
            }
        }));
        assert_eq!(p.full_name().as_deref(), Some("Josiah Carberry"));
    }

    #[test]
    fn full_name_skips_missing_parts() {
        let p = person(json!({
            "name": { "given-names": null, "family-name": {"value": "Carberry"} }
        }));
        assert_eq!(p.full_name().as_deref(), Some("Carberry"));
    }

    #[test]
    fn full_name_is_none_when_empty() {
        assert_eq!(person(json!({"name": null})).full_name(), None);
        let p = person(json!({
            "name": { "given-names": {"value": ""}, "family-name": {"value": null} }
        }));
        assert_eq!(p.full_name(), None);
    }

    #[test]
    fn title_variants_decode() {
        let plain: TitleValue = serde_json::from_value(json!("A title")).unwrap();
        assert_eq!(plain, TitleValue::Plain("A title".into()));

        let structured: TitleValue = serde_json::from_value(json!({"value": "B"})).unwrap();
        assert_eq!(
            structured,
            TitleValue::Structured {
                value: Some("B".into())
            }
        );

        let other: TitleValue = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(other, TitleValue::Other(json!(42)));
    }

    #[test]
    fn structured_title_with_non_string_value_has_no_value() {
        let v: TitleValue = serde_json::from_value(json!({"value": 7})).unwrap();
        assert_eq!(v, TitleValue::Structured { value: None });

        let v: TitleValue = serde_json::from_value(json!(["odd"])).unwrap();
        assert_eq!(v, TitleValue::Other(json!(["odd"])));
    }

    #[test]
    fn first_doi_is_case_insensitive_and_first_wins() {
        let ws: WorkSummary = serde_json::from_value(json!({
            "external-ids": {"external-id": [
                {"external-id-type": "isbn", "external-id-value": "978-3"},
                {"external-id-type": "DOI", "external-id-value": "10.1/first"},
                {"external-id-type": "doi", "external-id-value": "10.1/second"}
            ]}
        }))
        .unwrap();
        assert_eq!(ws.first_doi(), Some("10.1/first"));
    }

    #[test]
    fn empty_doi_values_are_skipped() {
        let ws: WorkSummary = serde_json::from_value(json!({
            "external-ids": {"external-id": [
                {"external-id-type": "doi", "external-id-value": ""},
                {"external-id-type": "doi", "external-id-value": "10.1/later"}
            ]}
        }))
        .unwrap();
        assert_eq!(ws.first_doi(), Some("10.1/later"));

        let ws: WorkSummary = serde_json::from_value(json!({
            "external-ids": {"external-id": [
                {"external-id-type": "doi", "external-id-value": null}
            ]}
        }))
        .unwrap();
        assert_eq!(ws.first_doi(), None);
    }

    #[test]
    fn null_external_ids_are_tolerated() {
        let ws: WorkSummary =
            serde_json::from_value(json!({"external-ids": {"external-id": null}})).unwrap();
        assert_eq!(ws.first_doi(), None);
    }

    #[test]
    fn string_timestamps_are_accepted() {
        let ws: WorkSummary = serde_json::from_value(json!({
            "created-date": {"value": " 1717243200000 "}
        }))
        .unwrap();
        assert_eq!(ws.effective_millis(), Some(1_717_243_200_000));

        let ws: WorkSummary = serde_json::from_value(json!({
            "created-date": {"value": "yesterday"},
            "last-modified-date": {"value": 5}
        }))
        .unwrap();
        assert_eq!(ws.effective_millis(), Some(5));
    }

    #[test]
    fn malformed_work_does_not_sink_its_siblings() {
        let resp: WorksResponse = serde_json::from_value(json!({
            "group": [
                {"work-summary": [
                    {"title": {"title": {"value": "good"}}, "created-date": {"value": 1}},
                    {"title": {"title": {"value": "bad ids"}},
                     "external-ids": {"external-id": [{"external-id-value": 10}]}},
                    {"put-code": "not a number"}
                ]},
                "not a group",
                {"work-summary": {"unexpected": "object"}},
                {"work-summary": [
                    {"title": {"title": {"value": "also good"}}, "created-date": {"value": "2"}}
                ]}
            ]
        }))
        .unwrap();

        let titles: Vec<_> = resp
            .group
            .unwrap_or_default()
            .iter()
            .flat_map(|g| g.work_summary.clone().unwrap_or_default())
            .map(|ws| match ws.title_value() {
                Some(TitleValue::Structured { value: Some(v) }) => v.clone(),
                other => panic!("unexpected title {other:?}"),
            })
            .collect();
        assert_eq!(titles, vec!["good", "also good"]);
    }

    #[test]
    fn non_list_group_reads_as_absent() {
        let resp: WorksResponse = serde_json::from_value(json!({"group": {"x": 1}})).unwrap();
        assert!(resp.group.is_none());
    }

    #[test]
    fn effective_millis_prefers_created() {
        let ws: WorkSummary = serde_json::from_value(json!({
            "created-date": {"value": 10},
            "last-modified-date": {"value": 20}
        }))
        .unwrap();
        assert_eq!(ws.effective_millis(), Some(10));

        let ws: WorkSummary =
            serde_json::from_value(json!({"last-modified-date": {"value": 20}})).unwrap();
        assert_eq!(ws.effective_millis(), Some(20));

        let ws: WorkSummary = serde_json::from_value(json!({"created-date": null})).unwrap();
        assert_eq!(ws.effective_millis(), None);
    }
}
