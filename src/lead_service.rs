use crate::errors::AppError;
use crate::links::{links_for_stage, LinkConfig};
use crate::models::{LeadEntry, LeadRequest, LeadResponse, LeadStage};
use crate::repository::LeadRepository;

/// Create and update flows for leads.
#[derive(Clone)]
pub struct LeadService {
    repository: LeadRepository,
    links: LinkConfig,
}

impl LeadService {
    pub fn new(repository: LeadRepository, links: LinkConfig) -> Self {
        Self { repository, links }
    }

    /// Creates a lead for a new identity.
    ///
    /// If the identity is already known nothing is written: the response carries
    /// the existing record, its stage and that stage's links, and the submitted
    /// payload is dropped. Clients move forward with [`LeadService::update_lead`].
    pub async fn create_lead(&self, lead: LeadRequest) -> Result<LeadResponse, AppError> {
        let identity = lead.identity();

        if let Some(existing) = self.repository.find_by_identity(&identity).await? {
            tracing::info!(
                "Lead already exists for {} at stage {} (submitted {})",
                identity,
                existing.stage(),
                lead.stage()
            );
            return Ok(self.response_for_existing(existing));
        }

        let entry = self.repository.insert(&lead).await?;
        tracing::info!("Created lead {} at stage {}", entry.id, entry.stage());

        Ok(self.response(entry.stage()))
    }

    /// Merges a stage payload into the record for its identity.
    ///
    /// The whole document is replaced by the payload; `createdAt` is kept and
    /// `updatedAt` refreshed. The stage is stored as submitted, downgrades
    /// included.
    pub async fn update_lead(&self, lead: LeadRequest) -> Result<LeadResponse, AppError> {
        let identity = lead.identity();

        let Some(existing) = self.repository.find_by_identity(&identity).await? else {
            return Err(AppError::NotFound(
                "Lead entry does not exist for upsert".to_string(),
            ));
        };

        if lead.stage() < existing.stage() {
            tracing::warn!(
                "Lead {} moves back from {} to {}",
                existing.id,
                existing.stage(),
                lead.stage()
            );
        }

        let entry = self.repository.upsert(&lead).await?;
        tracing::info!(
            "Updated lead {} from {} to {}",
            entry.id,
            existing.stage(),
            entry.stage()
        );

        Ok(self.response(entry.stage()))
    }

    fn response(&self, stage: LeadStage) -> LeadResponse {
        let links = links_for_stage(stage, &self.links);
        LeadResponse {
            lead_stage: stage,
            data_acquisition_link: links.data_acquisition,
            appointment_booking_link: links.appointment_booking,
            existing_data: None,
        }
    }

    fn response_for_existing(&self, existing: LeadEntry) -> LeadResponse {
        let stage = existing.stage();
        LeadResponse {
            existing_data: Some(existing),
            ..self.response(stage)
        }
    }
}
