use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use tableops_resource::schema::v0::TableInputs;

/// Input properties as given on the command line.
pub(crate) struct InputSources<'a> {
    pub inputs_json: Option<&'a str>,
    /// NAME, JSON pairs
    pub input_json: &'a [String],
    /// NAME, STR pairs
    pub input_str: &'a [String],
    /// Used when the inputs do not name an endpoint themselves
    pub endpoint: Option<&'a str>,
}

// NOTE (loss of ordering):
//
// clap_derive cannot tell us the relative order of the flags, so a later
// input cannot override an earlier one. Duplicates are rejected instead,
// which leaves room for adding overriding later without a breaking change.
pub(crate) fn gather(sources: &InputSources<'_>) -> Result<Map<String, Value>> {
    let mut inputs = match sources.inputs_json {
        Some(json_string) => serde_json::from_str::<Map<String, Value>>(json_string)
            .with_context(|| "failed to parse value of --inputs-json")?,
        None => Map::new(),
    };

    for pair in sources.input_json.chunks(2) {
        let [k, v] = pair else {
            bail!("--input-json takes a NAME and a JSON value");
        };
        if inputs.contains_key(k) {
            bail!("duplicate input: {}", k);
        }
        inputs.insert(
            k.clone(),
            serde_json::from_str(v)
                .with_context(|| format!("failed to parse JSON value for input: {}", k))?,
        );
    }
    for pair in sources.input_str.chunks(2) {
        let [k, v] = pair else {
            bail!("--input-str takes a NAME and a string");
        };
        if inputs.contains_key(k) {
            bail!("duplicate input: {}", k);
        }
        inputs.insert(k.clone(), Value::String(v.clone()));
    }

    if let Some(endpoint) = sources.endpoint {
        inputs
            .entry("endpoint")
            .or_insert_with(|| Value::String(endpoint.to_string()));
    }

    Ok(inputs)
}

pub(crate) fn table_inputs(sources: &InputSources<'_>) -> Result<TableInputs> {
    let inputs = gather(sources)?;
    serde_json::from_value(Value::Object(inputs))
        .with_context(|| "Could not deserialize input properties for table resource")
}
