//! Module parameters: typed values, GUI state, dirty tracking and the late
//! link to a parameter of the running graph.
//!
//! Stock catalogs carry defaults and bounds as strings; [`ParamValue::parse`]
//! turns them into typed values. Values assigned by the editor mark the
//! parameter `value_dirty`, values pulled from the host never do.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::id::ParamId;
use crate::stock::StockParameter;

/// Closed set of parameter types known to the configurator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Bool,
    Button,
    Int,
    Float,
    String,
    FilePath,
    Enum,
    Color,
    Vec2,
    Vec3,
    TransferFunction,
}

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ParamValue {
    Bool(bool),
    Button,
    Int(i64),
    Float(f32),
    String(String),
    FilePath(String),
    Enum(i64),
    Color([f32; 4]),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    TransferFunction(String),
}

impl ParamValue {
    /// The type tag of this value.
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Bool(_) => ParamType::Bool,
            ParamValue::Button => ParamType::Button,
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::String(_) => ParamType::String,
            ParamValue::FilePath(_) => ParamType::FilePath,
            ParamValue::Enum(_) => ParamType::Enum,
            ParamValue::Color(_) => ParamType::Color,
            ParamValue::Vec2(_) => ParamType::Vec2,
            ParamValue::Vec3(_) => ParamType::Vec3,
            ParamValue::TransferFunction(_) => ParamType::TransferFunction,
        }
    }

    /// The zero value of a type, used when a stock default fails to parse.
    pub fn default_for(param_type: ParamType) -> ParamValue {
        match param_type {
            ParamType::Bool => ParamValue::Bool(false),
            ParamType::Button => ParamValue::Button,
            ParamType::Int => ParamValue::Int(0),
            ParamType::Float => ParamValue::Float(0.0),
            ParamType::String => ParamValue::String(String::new()),
            ParamType::FilePath => ParamValue::FilePath(String::new()),
            ParamType::Enum => ParamValue::Enum(0),
            ParamType::Color => ParamValue::Color([0.0, 0.0, 0.0, 1.0]),
            ParamType::Vec2 => ParamValue::Vec2([0.0; 2]),
            ParamType::Vec3 => ParamValue::Vec3([0.0; 3]),
            ParamType::TransferFunction => ParamValue::TransferFunction(String::new()),
        }
    }

    /// Parses the string form of a value of `param_type`.
    ///
    /// Vectors and colors are `;`-separated components. Booleans accept
    /// `true/false`, `on/off` and `1/0` in any case.
    pub fn parse(param_type: ParamType, input: &str) -> Result<ParamValue, GraphError> {
        let err = || GraphError::ParamParse {
            param_type,
            input: input.to_string(),
        };
        let trimmed = input.trim();
        let value = match param_type {
            ParamType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => ParamValue::Bool(true),
                "false" | "off" | "0" => ParamValue::Bool(false),
                _ => return Err(err()),
            },
            ParamType::Button => ParamValue::Button,
            ParamType::Int => ParamValue::Int(trimmed.parse().map_err(|_| err())?),
            ParamType::Float => ParamValue::Float(trimmed.parse().map_err(|_| err())?),
            ParamType::String => ParamValue::String(input.to_string()),
            ParamType::FilePath => ParamValue::FilePath(input.to_string()),
            ParamType::Enum => ParamValue::Enum(trimmed.parse().map_err(|_| err())?),
            ParamType::Color => ParamValue::Color(parse_components::<4>(trimmed).ok_or_else(err)?),
            ParamType::Vec2 => ParamValue::Vec2(parse_components::<2>(trimmed).ok_or_else(err)?),
            ParamType::Vec3 => ParamValue::Vec3(parse_components::<3>(trimmed).ok_or_else(err)?),
            ParamType::TransferFunction => ParamValue::TransferFunction(input.to_string()),
        };
        Ok(value)
    }

    /// Clamps numeric values into `[min, max]` when bounds of the same type
    /// are given. Non-numeric values pass through.
    pub fn clamped(self, min: Option<&ParamValue>, max: Option<&ParamValue>) -> ParamValue {
        match self {
            ParamValue::Int(mut v) => {
                if let Some(ParamValue::Int(lo)) = min {
                    v = v.max(*lo);
                }
                if let Some(ParamValue::Int(hi)) = max {
                    v = v.min(*hi);
                }
                ParamValue::Int(v)
            }
            ParamValue::Float(mut v) => {
                if let Some(ParamValue::Float(lo)) = min {
                    v = v.max(*lo);
                }
                if let Some(ParamValue::Float(hi)) = max {
                    v = v.min(*hi);
                }
                ParamValue::Float(v)
            }
            other => other,
        }
    }
}

fn parse_components<const N: usize>(input: &str) -> Option<[f32; N]> {
    let mut out = [0.0f32; N];
    let mut parts = input.split(';');
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

fn join_components(f: &mut fmt::Formatter<'_>, values: &[f32]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ";")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Button => Ok(()),
            ParamValue::Int(v) | ParamValue::Enum(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::String(s) | ParamValue::FilePath(s) | ParamValue::TransferFunction(s) => {
                write!(f, "{s}")
            }
            ParamValue::Color(c) => join_components(f, c),
            ParamValue::Vec2(c) => join_components(f, c),
            ParamValue::Vec3(c) => join_components(f, c),
        }
    }
}

/// How the presentation layer should draw a parameter widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParamPresentation {
    #[default]
    Basic,
    String,
    Color,
    FilePath,
    Slider,
    Drag,
    Checkbox,
    TransferFunction,
}

/// GUI state blob of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamGuiState {
    pub visible: bool,
    pub read_only: bool,
    pub presentation: ParamPresentation,
    pub expert: bool,
}

impl Default for ParamGuiState {
    fn default() -> Self {
        ParamGuiState {
            visible: true,
            read_only: false,
            presentation: ParamPresentation::Basic,
            expert: false,
        }
    }
}

/// Names the running-graph parameter an editor parameter is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamLink {
    /// Full name of the host module (`::name`).
    pub module: String,
    /// Full name of the host parameter slot.
    pub param: String,
}

/// Editor-side parameter of a module instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    id: ParamId,
    /// Name relative to the owning module (e.g. `radius` or `view::camera`).
    pub full_name: String,
    pub description: String,
    param_type: ParamType,
    value: ParamValue,
    minval: Option<ParamValue>,
    maxval: Option<ParamValue>,
    gui: ParamGuiState,
    value_dirty: bool,
    gui_state_dirty: bool,
    #[serde(skip)]
    host_link: Option<ParamLink>,
}

impl Parameter {
    /// Instantiates a parameter from its stock template.
    ///
    /// Stock visibility, read-only and presentation are copied as given; the
    /// global `expert_mode` default is applied on top.
    pub fn from_stock(template: &StockParameter, expert_mode: bool) -> Self {
        let param_type = template.param_type;

        let parse_bound = |bound: &Option<String>| {
            bound
                .as_deref()
                .and_then(|s| ParamValue::parse(param_type, s).ok())
        };
        let minval = parse_bound(&template.minval);
        let maxval = parse_bound(&template.maxval);

        let value = match ParamValue::parse(param_type, &template.default_value) {
            Ok(v) => v.clamped(minval.as_ref(), maxval.as_ref()),
            Err(e) => {
                tracing::warn!(param = %template.full_name, error = %e, "invalid stock default, using type default");
                ParamValue::default_for(param_type)
            }
        };

        Parameter {
            id: ParamId::generate(),
            full_name: template.full_name.clone(),
            description: template.description.clone(),
            param_type,
            value,
            minval,
            maxval,
            gui: ParamGuiState {
                visible: template.gui_visibility,
                read_only: template.gui_read_only,
                presentation: template.gui_presentation,
                expert: expert_mode,
            },
            value_dirty: false,
            gui_state_dirty: false,
            host_link: None,
        }
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn minval(&self) -> Option<&ParamValue> {
        self.minval.as_ref()
    }

    pub fn maxval(&self) -> Option<&ParamValue> {
        self.maxval.as_ref()
    }

    /// Assigns a value from the editor. Marks the value dirty when it
    /// changed; button values are always dirty.
    pub fn set_value(&mut self, value: ParamValue) -> Result<(), GraphError> {
        if value.param_type() != self.param_type {
            return Err(GraphError::ParamTypeMismatch {
                name: self.full_name.clone(),
                expected: self.param_type,
            });
        }
        let value = value.clamped(self.minval.as_ref(), self.maxval.as_ref());
        if value != self.value || self.param_type == ParamType::Button {
            self.value = value;
            self.value_dirty = true;
        }
        Ok(())
    }

    /// Parses and assigns a value string.
    pub fn set_value_str(&mut self, input: &str) -> Result<(), GraphError> {
        let value = ParamValue::parse(self.param_type, input)?;
        self.set_value(value)
    }

    /// Triggers a button parameter.
    pub fn press(&mut self) {
        if self.param_type == ParamType::Button {
            self.value_dirty = true;
        }
    }

    pub fn gui_state(&self) -> ParamGuiState {
        self.gui
    }

    /// Assigns GUI state from the editor and marks it dirty.
    pub fn set_gui_state(&mut self, state: ParamGuiState) {
        if state != self.gui {
            self.gui = state;
            self.gui_state_dirty = true;
        }
    }

    /// Marks the GUI state dirty so it is pushed on the next sync pass.
    pub fn force_gui_state_dirty(&mut self) {
        self.gui_state_dirty = true;
    }

    pub fn is_value_dirty(&self) -> bool {
        self.value_dirty
    }

    pub fn reset_value_dirty(&mut self) {
        self.value_dirty = false;
    }

    pub fn is_gui_state_dirty(&self) -> bool {
        self.gui_state_dirty
    }

    pub fn reset_gui_state_dirty(&mut self) {
        self.gui_state_dirty = false;
    }

    /// Takes a value read from the running graph without marking it dirty.
    /// Values of a different type are ignored.
    pub fn apply_host_value(&mut self, value: ParamValue) {
        if value.param_type() == self.param_type {
            self.value = value;
        }
    }

    /// Takes GUI state read from the running graph without marking it dirty.
    pub fn apply_host_gui_state(&mut self, state: ParamGuiState) {
        self.gui = state;
    }

    pub fn host_link(&self) -> Option<&ParamLink> {
        self.host_link.as_ref()
    }

    pub fn bind(&mut self, link: ParamLink) {
        self.host_link = Some(link);
    }

    pub fn unbind(&mut self) {
        self.host_link = None;
    }

    /// Name of this parameter qualified by its module's full name, as used
    /// by the running graph and the editor-state blob.
    pub fn qualified_name(&self, module_full_name: &str) -> String {
        format!("{}::{}", module_full_name, self.full_name)
    }
}
