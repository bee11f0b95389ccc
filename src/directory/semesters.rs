// Semester attachments under a program, mirroring the program/school shape.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{ProgramId, Semester, SemesterId};
use crate::store::DirectoryStore;

#[derive(Clone)]
pub struct Semesters {
    store: Arc<DirectoryStore>,
}

impl Semesters {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        Semesters { store }
    }

    pub async fn list(&self, program_id: ProgramId) -> AppResult<Vec<Semester>> {
        self.ensure_program(program_id).await?;
        Ok(self.store.semesters_for_program(program_id).await?)
    }

    pub async fn create(
        &self,
        program_id: ProgramId,
        name: String,
        description: Option<String>,
        start_date: Option<i64>,
        end_date: Option<i64>,
    ) -> AppResult<Semester> {
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "Semester name must not be empty".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                return Err(AppError::Validation(
                    "Semester end date precedes its start date".to_string(),
                ));
            }
        }
        self.ensure_program(program_id).await?;

        self.store
            .create_semester(program_id, &name, description.as_deref(), start_date, end_date)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("Semester name '{}' is already in use", name))
            })
    }

    pub async fn update(
        &self,
        program_id: ProgramId,
        semester_id: SemesterId,
        name: String,
        description: Option<String>,
        start_date: Option<i64>,
        end_date: Option<i64>,
    ) -> AppResult<Semester> {
        let semester = self.load(semester_id).await?;
        if semester.program_id != program_id {
            return Err(semester_not_found(semester_id));
        }

        self.store
            .update_semester(semester_id, &name, description.as_deref(), start_date, end_date)
            .await?;
        self.load(semester_id).await
    }

    pub async fn delete(&self, program_id: ProgramId, semester_id: SemesterId) -> AppResult<()> {
        let semester = self.load(semester_id).await?;
        if semester.program_id != program_id {
            return Err(semester_not_found(semester_id));
        }
        self.store.delete_semester(semester_id).await?;
        Ok(())
    }

    async fn load(&self, semester_id: SemesterId) -> AppResult<Semester> {
        self.store
            .get_semester(semester_id)
            .await?
            .ok_or_else(|| semester_not_found(semester_id))
    }

    async fn ensure_program(&self, program_id: ProgramId) -> AppResult<()> {
        if self.store.get_program(program_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Program {} not found",
                program_id
            )));
        }
        Ok(())
    }
}

fn semester_not_found(id: SemesterId) -> AppError {
    AppError::NotFound(format!("Semester {} not found", id))
}
