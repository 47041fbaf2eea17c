//! Host-facing parameter sets.
//!
//! Every control is a float in `[0, 1]`; the engines derive their musical
//! ranges internally. The structs serialize as flat maps keyed by parameter
//! id, and accept the identifiers older plugin sessions used as aliases.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub default: f32,
    /// Identifier older plugin sessions saved this parameter under.
    pub legacy_id: Option<&'static str>,
}

impl ParamSpec {
    const fn new(id: &'static str, label: &'static str, default: f32) -> Self {
        Self {
            id,
            label,
            default,
            legacy_id: None,
        }
    }

    const fn legacy(mut self, legacy_id: &'static str) -> Self {
        self.legacy_id = Some(legacy_id);
        self
    }

    pub fn matches(&self, id: &str) -> bool {
        self.id == id || self.legacy_id == Some(id)
    }
}

pub trait ParamSet: Default + Clone + Send + 'static {
    const SPECS: &'static [ParamSpec];

    /// Value of the parameter with canonical id `id`.
    fn field(&self, id: &str) -> Option<f32>;

    fn field_mut(&mut self, id: &str) -> Option<&mut f32>;

    fn spec(id: &str) -> Option<&'static ParamSpec> {
        Self::SPECS.iter().find(|spec| spec.matches(id))
    }

    fn get_parameter(&self, id: &str) -> Result<f32, &'static str> {
        let spec = Self::spec(id).ok_or("Unknown parameter")?;
        self.field(spec.id).ok_or("Unknown parameter")
    }

    fn set_parameter(&mut self, id: &str, value: f32) -> Result<(), &'static str> {
        let spec = Self::spec(id).ok_or("Unknown parameter")?;
        if !(0.0..=1.0).contains(&value) {
            return Err("Parameter value must be between 0.0 and 1.0");
        }
        let slot = self.field_mut(spec.id).ok_or("Unknown parameter")?;
        *slot = value;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbParams {
    pub mix: f32,
    pub size: f32,
    pub damp: f32,
    pub tone: f32,
    #[serde(alias = "param5")]
    pub shimmer: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            mix: 0.4,
            size: 0.6,
            damp: 0.3,
            tone: 0.5,
            shimmer: 0.0,
        }
    }
}

impl ParamSet for ReverbParams {
    const SPECS: &'static [ParamSpec] = &[
        ParamSpec::new("mix", "MIX", 0.4),
        ParamSpec::new("size", "SIZE", 0.6),
        ParamSpec::new("damp", "DAMP", 0.3),
        ParamSpec::new("tone", "TONE", 0.5),
        ParamSpec::new("shimmer", "SHIMMER", 0.0).legacy("param5"),
    ];

    fn field(&self, id: &str) -> Option<f32> {
        match id {
            "mix" => Some(self.mix),
            "size" => Some(self.size),
            "damp" => Some(self.damp),
            "tone" => Some(self.tone),
            "shimmer" => Some(self.shimmer),
            _ => None,
        }
    }

    fn field_mut(&mut self, id: &str) -> Option<&mut f32> {
        match id {
            "mix" => Some(&mut self.mix),
            "size" => Some(&mut self.size),
            "damp" => Some(&mut self.damp),
            "tone" => Some(&mut self.tone),
            "shimmer" => Some(&mut self.shimmer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayParams {
    pub mix: f32,
    #[serde(alias = "size")]
    pub time: f32,
    #[serde(alias = "param5")]
    pub feedback: f32,
    #[serde(alias = "param6")]
    pub tone: f32,
    #[serde(alias = "damp")]
    pub sub: f32,
    #[serde(alias = "pre")]
    pub pingpong: f32,
    #[serde(rename = "mod", alias = "param7")]
    pub modulation: f32,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            mix: 0.4,
            time: 0.35,
            feedback: 0.3,
            tone: 0.5,
            sub: 0.5,
            pingpong: 0.0,
            modulation: 0.15,
        }
    }
}

impl ParamSet for DelayParams {
    const SPECS: &'static [ParamSpec] = &[
        ParamSpec::new("mix", "MIX", 0.4),
        ParamSpec::new("time", "TIME", 0.35).legacy("size"),
        ParamSpec::new("feedback", "FDBK", 0.3).legacy("param5"),
        ParamSpec::new("tone", "TONE", 0.5).legacy("param6"),
        ParamSpec::new("sub", "SUB", 0.5).legacy("damp"),
        ParamSpec::new("pingpong", "PING", 0.0).legacy("pre"),
        ParamSpec::new("mod", "MOD", 0.15).legacy("param7"),
    ];

    fn field(&self, id: &str) -> Option<f32> {
        match id {
            "mix" => Some(self.mix),
            "time" => Some(self.time),
            "feedback" => Some(self.feedback),
            "tone" => Some(self.tone),
            "sub" => Some(self.sub),
            "pingpong" => Some(self.pingpong),
            "mod" => Some(self.modulation),
            _ => None,
        }
    }

    fn field_mut(&mut self, id: &str) -> Option<&mut f32> {
        match id {
            "mix" => Some(&mut self.mix),
            "time" => Some(&mut self.time),
            "feedback" => Some(&mut self.feedback),
            "tone" => Some(&mut self.tone),
            "sub" => Some(&mut self.sub),
            "pingpong" => Some(&mut self.pingpong),
            "mod" => Some(&mut self.modulation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationParams {
    #[serde(alias = "bias")]
    pub grit: f32,
    #[serde(alias = "param2")]
    pub tone: f32,
    #[serde(alias = "param3")]
    pub warmth: f32,
    #[serde(alias = "param4")]
    pub attack: f32,
    pub output: f32,
    pub mix: f32,
    pub drive: f32,
    /// Continuous shaper selection, see [`crate::fx::shapers::blend`].
    #[serde(rename = "type")]
    pub kind: f32,
    #[serde(alias = "param9")]
    pub comp: f32,
}

impl Default for SaturationParams {
    fn default() -> Self {
        Self {
            grit: 0.3,
            tone: 0.5,
            warmth: 0.4,
            attack: 0.3,
            output: 0.6,
            mix: 0.8,
            drive: 0.35,
            kind: 0.0,
            comp: 0.2,
        }
    }
}

impl ParamSet for SaturationParams {
    const SPECS: &'static [ParamSpec] = &[
        ParamSpec::new("grit", "GRIT", 0.3).legacy("bias"),
        ParamSpec::new("tone", "TONE", 0.5).legacy("param2"),
        ParamSpec::new("warmth", "WARMTH", 0.4).legacy("param3"),
        ParamSpec::new("attack", "ATTACK", 0.3).legacy("param4"),
        ParamSpec::new("output", "OUTPUT", 0.6),
        ParamSpec::new("mix", "MIX", 0.8),
        ParamSpec::new("drive", "DRIVE", 0.35),
        ParamSpec::new("type", "TYPE", 0.0),
        ParamSpec::new("comp", "COMP", 0.2).legacy("param9"),
    ];

    fn field(&self, id: &str) -> Option<f32> {
        match id {
            "grit" => Some(self.grit),
            "tone" => Some(self.tone),
            "warmth" => Some(self.warmth),
            "attack" => Some(self.attack),
            "output" => Some(self.output),
            "mix" => Some(self.mix),
            "drive" => Some(self.drive),
            "type" => Some(self.kind),
            "comp" => Some(self.comp),
            _ => None,
        }
    }

    fn field_mut(&mut self, id: &str) -> Option<&mut f32> {
        match id {
            "grit" => Some(&mut self.grit),
            "tone" => Some(&mut self.tone),
            "warmth" => Some(&mut self.warmth),
            "attack" => Some(&mut self.attack),
            "output" => Some(&mut self.output),
            "mix" => Some(&mut self.mix),
            "drive" => Some(&mut self.drive),
            "type" => Some(&mut self.kind),
            "comp" => Some(&mut self.comp),
            _ => None,
        }
    }
}
