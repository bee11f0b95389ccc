// Program attachments under a school: create the child with its parent
// back-reference, detach in the inverse order. No aggregate is derived from
// programs, so no recompute step.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Program, ProgramId, SchoolId};
use crate::store::DirectoryStore;

#[derive(Clone)]
pub struct Programs {
    store: Arc<DirectoryStore>,
}

impl Programs {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        Programs { store }
    }

    pub async fn list(&self, school_id: SchoolId) -> AppResult<Vec<Program>> {
        self.ensure_school(school_id).await?;
        Ok(self.store.programs_for_school(school_id).await?)
    }

    pub async fn create(
        &self,
        school_id: SchoolId,
        name: String,
        description: Option<String>,
    ) -> AppResult<Program> {
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "Program name must not be empty".to_string(),
            ));
        }
        self.ensure_school(school_id).await?;

        self.store
            .create_program(school_id, &name, description.as_deref())
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("Program name '{}' is already in use", name))
            })
    }

    pub async fn update(
        &self,
        school_id: SchoolId,
        program_id: ProgramId,
        name: String,
        description: Option<String>,
    ) -> AppResult<Program> {
        let program = self.load(program_id).await?;
        if program.school_id != school_id {
            return Err(program_not_found(program_id));
        }

        self.store
            .update_program(program_id, &name, description.as_deref())
            .await?;
        self.load(program_id).await
    }

    pub async fn delete(&self, school_id: SchoolId, program_id: ProgramId) -> AppResult<()> {
        let program = self.load(program_id).await?;
        if program.school_id != school_id {
            return Err(program_not_found(program_id));
        }
        self.store.delete_program(program_id).await?;
        Ok(())
    }

    async fn load(&self, program_id: ProgramId) -> AppResult<Program> {
        self.store
            .get_program(program_id)
            .await?
            .ok_or_else(|| program_not_found(program_id))
    }

    async fn ensure_school(&self, school_id: SchoolId) -> AppResult<()> {
        if self.store.get_school(school_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "School {} not found",
                school_id
            )));
        }
        Ok(())
    }
}

fn program_not_found(id: ProgramId) -> AppError {
    AppError::NotFound(format!("Program {} not found", id))
}
