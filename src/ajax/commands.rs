use serde::Deserialize;
use serde_json::{Map, Value};

/// One server-issued instruction, tagged by its `command` field.
///
/// Payload fields the server omits fall back to their defaults; a payload
/// with a field of the wrong shape fails to deserialize and is skipped by
/// the dispatcher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    Insert(Insert),
    Remove(Remove),
    Changed(Changed),
    Alert(Alert),
    Redirect(Redirect),
    Css(Css),
    Settings(SettingsCommand),
    Data(Data),
    Invoke(Invoke),
    Restripe(Restripe),
    AddCss(AddCss),
    UpdateBuildId(UpdateBuildId),
    #[serde(other)]
    Unknown,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Insert(_) => "insert",
            Command::Remove(_) => "remove",
            Command::Changed(_) => "changed",
            Command::Alert(_) => "alert",
            Command::Redirect(_) => "redirect",
            Command::Css(_) => "css",
            Command::Settings(_) => "settings",
            Command::Data(_) => "data",
            Command::Invoke(_) => "invoke",
            Command::Restripe(_) => "restripe",
            Command::AddCss(_) => "addCss",
            Command::UpdateBuildId(_) => "updateBuildId",
            Command::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Insert {
    pub selector: Option<String>,
    /// Markup to insert. Non-string values are rendered as text.
    pub data: Value,
    pub method: Option<String>,
    pub effect: Option<String>,
    /// Either a named speed or milliseconds.
    pub speed: Option<Value>,
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Remove {
    pub selector: String,
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Changed {
    pub selector: String,
    /// Sub-selector that receives the "changed" marker.
    pub asterisk: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Alert {
    pub text: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Redirect {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Css {
    pub selector: String,
    pub argument: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SettingsCommand {
    pub settings: Value,
    pub merge: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Data {
    pub selector: String,
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Invoke {
    pub selector: String,
    pub method: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Restripe {
    pub selector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AddCss {
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpdateBuildId {
    pub old: String,
    pub new: String,
}

/// Name of a raw command object, if it has one.
pub fn command_name(raw: &Value) -> Option<&str> {
    raw.get("command").and_then(Value::as_str)
}
