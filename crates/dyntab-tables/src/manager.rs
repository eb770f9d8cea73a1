use dyntab_repo::{AcpiTableInfo, ConfigRepository, ConfigurationManager, RepositoryExt};
use dyntab_types::Token;

use crate::error::{TableError, TableResult};
use crate::registry::GeneratorRegistry;
use crate::table::AcpiTable;

/// Drives the registered generators over the platform's table list.
#[derive(Debug, Default)]
pub struct TableManager {
    registry: GeneratorRegistry,
}

impl TableManager {
    pub fn new(registry: GeneratorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut GeneratorRegistry {
        &mut self.registry
    }

    /// The tables the platform asks for.
    pub fn requests(&self, repo: &dyn ConfigRepository) -> TableResult<Vec<AcpiTableInfo>> {
        let requests: Vec<AcpiTableInfo> = repo.get_list(Token::NULL).map_err(|e| {
            if e.is_not_found() {
                tracing::error!("no ACPI table list in the repository");
            }
            e
        })?;
        Ok(requests)
    }

    /// Build one table and finalize its checksum.
    pub fn build(
        &self,
        request: &AcpiTableInfo,
        repo: &dyn ConfigRepository,
    ) -> TableResult<AcpiTable> {
        let generator = self.registry.find(request.generator_id).ok_or_else(|| {
            tracing::error!(
                generator = %request.generator_id,
                signature = %request.signature,
                "no generator registered for table"
            );
            TableError::NotFound(format!("generator {}", request.generator_id))
        })?;
        let mut table = generator.build(request, repo).map_err(|e| {
            tracing::error!(signature = %request.signature, "failed to build table: {}", e);
            e
        })?;
        table.finalize_checksum();
        Ok(table)
    }

    /// Build every requested table, stopping at the first failure.
    pub fn build_all(&self, repo: &dyn ConfigRepository) -> TableResult<Vec<AcpiTable>> {
        let requests = self.requests(repo)?;
        let mut tables = Vec::with_capacity(requests.len());
        for request in &requests {
            tables.push(self.build(request, repo)?);
        }
        tracing::info!(count = tables.len(), "built all requested tables");
        Ok(tables)
    }

    /// Build against a frozen copy of the manager's repository.
    pub fn build_installed(&self, manager: &ConfigurationManager) -> TableResult<Vec<AcpiTable>> {
        if !manager.is_installed() {
            return Err(TableError::Unsupported(
                "configuration manager is not installed".into(),
            ));
        }
        self.build_all(&manager.snapshot())
    }
}
