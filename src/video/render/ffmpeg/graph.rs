//! Typed filtergraph construction.
//!
//! Filters, pads and chains are plain values. Wiring is checked by [`FilterGraph::to_script`]
//! before anything is serialized, and serialization is the only place escaping happens.

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use super::escape::{escape_graph_segment, escape_option_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    Video,
    Audio,
}

impl StreamType {
    fn specifier(self) -> &'static str {
        match self {
            StreamType::Video => "v",
            StreamType::Audio => "a",
        }
    }
}

/// A connection point in the graph: either a stream of an `-i` input or a named link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pad {
    Input { index: usize, stream: StreamType },
    Label(String),
}

impl Pad {
    pub fn video(index: usize) -> Self {
        Pad::Input {
            index,
            stream: StreamType::Video,
        }
    }

    pub fn audio(index: usize) -> Self {
        Pad::Input {
            index,
            stream: StreamType::Audio,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Pad::Label(name.into())
    }

    fn label_name(&self) -> Option<&str> {
        match self {
            Pad::Label(name) => Some(name),
            Pad::Input { .. } => None,
        }
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pad::Input { index, stream } => write!(f, "[{index}:{}]", stream.specifier()),
            Pad::Label(name) => write!(f, "[{name}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FilterArg {
    Positional(String),
    Named(&'static str, String),
}

/// One filter with its arguments, e.g. `scale=1080:1920` or `afade=t=out:st=3:d=0.25`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: &'static str,
    args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(FilterArg::Positional(value.to_string()));
        self
    }

    /// Append a `key=value` argument.
    pub fn opt(mut self, key: &'static str, value: impl ToString) -> Self {
        self.args.push(FilterArg::Named(key, value.to_string()));
        self
    }

    /// Raw (unescaped) value of a named argument.
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|arg| match arg {
            FilterArg::Named(name, value) if *name == key => Some(value.as_str()),
            _ => None,
        })
    }

    fn render(&self) -> String {
        if self.args.is_empty() {
            return self.name.to_string();
        }
        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                FilterArg::Positional(value) => escape_option_value(value),
                FilterArg::Named(key, value) => format!("{key}={}", escape_option_value(value)),
            })
            .collect::<Vec<_>>()
            .join(":");
        escape_graph_segment(&format!("{}={args}", self.name))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A linear run of filters with its input and output pads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chain {
    inputs: Vec<Pad>,
    filters: Vec<Filter>,
    outputs: Vec<Pad>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pad(pad: Pad) -> Self {
        Self::new().input(pad)
    }

    pub fn input(mut self, pad: Pad) -> Self {
        self.inputs.push(pad);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(Pad::label(name));
        self
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "{pad}")?;
        }
        let filters = self
            .filters
            .iter()
            .map(Filter::render)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&filters)?;
        for pad in &self.outputs {
            write!(f, "{pad}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("filter chain {0} has no filters")]
    EmptyChain(usize),
    #[error("invalid link label `{0}`")]
    InvalidLabel(String),
    #[error("link `{0}` is produced more than once")]
    DuplicateLabel(String),
    #[error("link `{0}` is consumed before it is produced")]
    UnknownLabel(String),
    #[error("link `{0}` is consumed more than once")]
    LabelConsumedTwice(String),
    #[error("link `{0}` is produced but never used")]
    DanglingLabel(String),
    #[error("graph references input {index} but only {available} inputs exist")]
    MissingInput { index: usize, available: usize },
    #[error("output `{0}` is mapped but never produced")]
    UnmappedOutput(String),
}

/// An ordered set of chains plus the links mapped to the output file.
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    chains: Vec<Chain>,
    mapped: Vec<String>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: Chain) {
        self.chains.push(chain);
    }

    /// Route the link `name` to the output file (`-map [name]`).
    pub fn map_output(&mut self, name: impl Into<String>) {
        self.mapped.push(name.into());
    }

    /// Check that every link is produced once, consumed once and in order.
    pub fn validate(&self, input_count: usize) -> Result<(), GraphError> {
        let mut produced: HashSet<&str> = HashSet::new();
        let mut consumed: HashMap<&str, usize> = HashMap::new();

        for (idx, chain) in self.chains.iter().enumerate() {
            if chain.filters.is_empty() {
                return Err(GraphError::EmptyChain(idx));
            }
            for pad in &chain.inputs {
                match pad {
                    Pad::Input { index, .. } if *index >= input_count => {
                        return Err(GraphError::MissingInput {
                            index: *index,
                            available: input_count,
                        });
                    }
                    Pad::Input { .. } => {}
                    Pad::Label(name) => {
                        if !produced.contains(name.as_str()) {
                            return Err(GraphError::UnknownLabel(name.clone()));
                        }
                        let uses = consumed.entry(name.as_str()).or_default();
                        *uses += 1;
                        if *uses > 1 {
                            return Err(GraphError::LabelConsumedTwice(name.clone()));
                        }
                    }
                }
            }
            for name in chain.outputs.iter().filter_map(Pad::label_name) {
                if !is_valid_label(name) {
                    return Err(GraphError::InvalidLabel(name.to_string()));
                }
                if !produced.insert(name) {
                    return Err(GraphError::DuplicateLabel(name.to_string()));
                }
            }
        }

        for name in &self.mapped {
            if !produced.contains(name.as_str()) {
                return Err(GraphError::UnmappedOutput(name.clone()));
            }
            let uses = consumed.entry(name.as_str()).or_default();
            *uses += 1;
            if *uses > 1 {
                return Err(GraphError::LabelConsumedTwice(name.clone()));
            }
        }

        let mut dangling: Vec<&str> = produced
            .into_iter()
            .filter(|name| !consumed.contains_key(name))
            .collect();
        dangling.sort_unstable();
        if let Some(name) = dangling.first() {
            return Err(GraphError::DanglingLabel((*name).to_string()));
        }

        Ok(())
    }

    /// Validate and serialize to the `-filter_complex` argument.
    pub fn to_script(&self, input_count: usize) -> Result<String, GraphError> {
        self.validate(input_count)?;
        Ok(self
            .chains
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";"))
    }

    /// `-map` arguments for every mapped output, in mapping order.
    pub fn map_args(&self) -> Vec<String> {
        self.mapped
            .iter()
            .flat_map(|name| ["-map".to_string(), format!("[{name}]")])
            .collect()
    }
}

fn is_valid_label(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
