use dyntab_types::{GeneratorId, Signature};

use crate::error::{TableError, TableResult};
use crate::generator::Generator;
use crate::generators::{IortGenerator, MadtGenerator, McfgGenerator, SratGenerator};

/// The set of generators available to the table manager.
pub struct GeneratorRegistry {
    generators: Vec<Box<dyn Generator>>,
}

impl GeneratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            generators: Vec::new(),
        }
    }

    /// A registry holding the IORT, MCFG, MADT, and SRAT generators.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let builtin: [Box<dyn Generator>; 4] = [
            Box::new(IortGenerator::new()),
            Box::new(McfgGenerator::new()),
            Box::new(MadtGenerator::new()),
            Box::new(SratGenerator::new()),
        ];
        for generator in builtin {
            // Ids are distinct, so registration cannot collide.
            if let Err(e) = registry.register(generator) {
                tracing::warn!("skipping built-in generator: {}", e);
            }
        }
        registry
    }

    /// Register a generator. Fails if one with the same id exists.
    pub fn register(&mut self, generator: Box<dyn Generator>) -> TableResult<()> {
        if self.find(generator.id()).is_some() {
            return Err(TableError::InvalidParameter(format!(
                "generator {} already registered",
                generator.id()
            )));
        }
        tracing::debug!(id = %generator.id(), signature = %generator.signature(), "registered generator");
        self.generators.push(generator);
        Ok(())
    }

    /// Remove and return the generator with `id`.
    pub fn deregister(&mut self, id: GeneratorId) -> TableResult<Box<dyn Generator>> {
        let pos = self
            .generators
            .iter()
            .position(|g| g.id() == id)
            .ok_or_else(|| TableError::NotFound(format!("generator {id}")))?;
        Ok(self.generators.remove(pos))
    }

    pub fn find(&self, id: GeneratorId) -> Option<&dyn Generator> {
        self.generators.iter().find(|g| g.id() == id).map(|g| g.as_ref())
    }

    pub fn find_by_signature(&self, signature: Signature) -> Option<&dyn Generator> {
        self.generators
            .iter()
            .find(|g| g.signature() == signature)
            .map(|g| g.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Generator> {
        self.generators.iter().map(|g| g.as_ref())
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.generators.iter().map(|g| g.id()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyntab_types::StdAcpiTableId;

    #[test]
    fn builtin_has_four_generators() {
        let registry = GeneratorRegistry::with_builtin();
        assert_eq!(registry.len(), 4);
        for table in [
            StdAcpiTableId::Iort,
            StdAcpiTableId::Mcfg,
            StdAcpiTableId::Madt,
            StdAcpiTableId::Srat,
        ] {
            assert!(registry.find(GeneratorId::std_acpi(table)).is_some());
        }
    }

    #[test]
    fn lookup_by_signature() {
        let registry = GeneratorRegistry::default();
        let generator = registry
            .find_by_signature(Signature::from_bytes(*b"APIC"))
            .unwrap();
        assert_eq!(generator.id(), GeneratorId::std_acpi(StdAcpiTableId::Madt));
        assert!(registry
            .find_by_signature(Signature::from_bytes(*b"NONE"))
            .is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = GeneratorRegistry::with_builtin();
        let err = registry.register(Box::new(IortGenerator::new())).unwrap_err();
        assert!(err.is_invalid_parameter());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn deregister_removes() {
        let mut registry = GeneratorRegistry::with_builtin();
        let id = GeneratorId::std_acpi(StdAcpiTableId::Srat);
        let removed = registry.deregister(id).unwrap();
        assert_eq!(removed.id(), id);
        assert!(registry.find(id).is_none());
        assert!(registry.deregister(id).err().is_some_and(|e| e.is_not_found()));
    }

    #[test]
    fn empty_registry() {
        let registry = GeneratorRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);
    }
}
