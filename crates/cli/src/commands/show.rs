//! Show Command

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use super::Context;
use crate::output::{print_list, TableDisplay};
use crate::workspace::ResourceRecord;

/// Resource display wrapper for serialization
#[derive(Debug, Serialize)]
pub struct ResourceRow {
    pub address: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
    pub update_trigger: String,
    pub output: BTreeMap<String, String>,
}

impl From<(&String, &ResourceRecord)> for ResourceRow {
    fn from((address, record): (&String, &ResourceRecord)) -> Self {
        Self {
            address: address.clone(),
            type_name: record.type_name.clone(),
            id: record.state.id.clone(),
            update_trigger: record.state.update_trigger.clone(),
            output: record.state.output.clone(),
        }
    }
}

impl TableDisplay for ResourceRow {
    fn headers() -> Vec<&'static str> {
        vec!["Address", "Type", "ID", "Update Trigger", "Output"]
    }

    fn row(&self) -> Vec<String> {
        let output = self
            .output
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        vec![
            self.address.clone(),
            self.type_name.clone(),
            short_id(&self.id).to_string(),
            self.update_trigger.clone(),
            output,
        ]
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let state = ctx.load_state()?;
    let rows: Vec<ResourceRow> = state.resources.iter().map(ResourceRow::from).collect();
    print_list(&rows, ctx.format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellform_common::{ResourceConfig, ResourceState};

    #[test]
    fn test_row_rendering() {
        let mut state = ResourceState::with_id("0123456789abcdef");
        state.output.insert("a".to_string(), "1".to_string());
        state.output.insert("b".to_string(), "2".to_string());
        let record = ResourceRecord::new("shell_script", ResourceConfig::default(), state);

        let row = ResourceRow::from((&"web".to_string(), &record));
        let cells = row.row();
        assert_eq!(cells[2], "0123456789ab");
        assert_eq!(cells[3], "created");
        assert_eq!(cells[4], "a=1\nb=2");
    }

    #[test]
    fn test_short_id_keeps_short_values() {
        assert_eq!(short_id("abc"), "abc");
    }
}
