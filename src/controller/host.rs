// Parameter host - registered parameters and their current host values
// Embedded by processors that expose parameters to host automation

use super::ParameterError;
use super::config::ParameterDefinition;
use std::collections::HashMap;

/// Registry of host-visible parameters with clamped current values
///
/// Definitions are validated when they are registered; lookups afterwards
/// cannot fail on malformed configuration.
#[derive(Debug, Clone, Default)]
pub struct ParameterHost {
    definitions: Vec<ParameterDefinition>,
    index: HashMap<String, usize>,
    values: Vec<f64>,
}

impl ParameterHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a host from a definition list
    pub fn with_definitions(
        definitions: Vec<ParameterDefinition>,
    ) -> Result<Self, ParameterError> {
        let mut host = Self::new();
        host.register_all(definitions)?;
        Ok(host)
    }

    /// Registers one parameter at its default value
    pub fn register(&mut self, definition: ParameterDefinition) -> Result<(), ParameterError> {
        if definition.id.is_empty() {
            return Err(ParameterError::EmptyId);
        }
        if self.index.contains_key(&definition.id) {
            return Err(ParameterError::DuplicateId(definition.id));
        }

        self.index
            .insert(definition.id.clone(), self.definitions.len());
        self.values.push(definition.config.default_value());
        self.definitions.push(definition);
        Ok(())
    }

    /// Registers a batch; nothing is registered if any entry is rejected
    pub fn register_all(
        &mut self,
        definitions: Vec<ParameterDefinition>,
    ) -> Result<(), ParameterError> {
        let mut staged = self.clone();
        for definition in definitions {
            staged.register(definition)?;
        }
        *self = staged;
        Ok(())
    }

    /// Registers a JSON array of `{id, config}` records
    pub fn register_json(&mut self, json: &str) -> Result<(), ParameterError> {
        let definitions = ParameterDefinition::list_from_json(json)?;
        self.register_all(definitions)
    }

    /// Replaces every registered parameter
    ///
    /// Values of parameters that keep their id are carried over (clamped to
    /// the new range).
    pub fn replace(&mut self, definitions: Vec<ParameterDefinition>) -> Result<(), ParameterError> {
        let mut next = Self::with_definitions(definitions)?;
        for (id, value) in self.iter() {
            if let Some(&i) = next.index.get(id) {
                next.values[i] = next.definitions[i].config.clamp(value);
            }
        }
        *self = next;
        Ok(())
    }

    pub fn definitions(&self) -> &[ParameterDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn value(&self, id: &str) -> Option<f64> {
        self.index.get(id).map(|&i| self.values[i])
    }

    /// Sets a value, clamped into the parameter's range; returns the stored value
    pub fn set_value(&mut self, id: &str, value: f64) -> Result<f64, ParameterError> {
        let &i = self
            .index
            .get(id)
            .ok_or_else(|| ParameterError::UnknownParameter(id.to_string()))?;
        let clamped = self.definitions[i].config.clamp(value);
        self.values[i] = clamped;
        Ok(clamped)
    }

    /// Current values in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.definitions
            .iter()
            .zip(self.values.iter())
            .map(|(d, v)| (d.id.as_str(), *v))
    }

    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.iter().map(|(id, v)| (id.to_string(), v)).collect()
    }

    pub fn reset_to_defaults(&mut self) {
        for (value, definition) in self.values.iter_mut().zip(&self.definitions) {
            *value = definition.config.default_value();
        }
    }
}
