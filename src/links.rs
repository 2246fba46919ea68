use crate::models::LeadStage;

/// Follow-up URLs handed back to the client after each stage.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Price calculator, offered after first contact.
    pub calculator: String,
    /// Form for the next round of building data.
    pub qualification: String,
    /// Photo upload for the site survey.
    pub photo_upload: String,
    /// Appointment booking, offered once a lead is ready to sell.
    pub appointment_booking: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            calculator: "https://www.vamo-energy.com/rechner".to_string(),
            qualification: "https://www.vamo-energy.com/digi-vot".to_string(),
            photo_upload: "https://www.vamo-energy.com/digi-vot-fotos".to_string(),
            appointment_booking: "https://www.vamo-energy.com/appointment-booking".to_string(),
        }
    }
}

/// The pair of links returned for a stage. At most one is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpLinks {
    pub data_acquisition: Option<String>,
    pub appointment_booking: Option<String>,
}

/// Maps a stage to its follow-up links.
pub fn links_for_stage(stage: LeadStage, config: &LinkConfig) -> FollowUpLinks {
    match stage {
        LeadStage::Minimal => FollowUpLinks {
            data_acquisition: Some(config.calculator.clone()),
            appointment_booking: None,
        },
        LeadStage::Qualification => FollowUpLinks {
            data_acquisition: Some(config.qualification.clone()),
            appointment_booking: None,
        },
        LeadStage::Discovery => FollowUpLinks {
            data_acquisition: Some(config.photo_upload.clone()),
            appointment_booking: None,
        },
        LeadStage::Selling => FollowUpLinks {
            data_acquisition: None,
            appointment_booking: Some(config.appointment_booking.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_stage_gets_one_link() {
        let config = LinkConfig::default();

        for stage in LeadStage::ALL {
            let links = links_for_stage(stage, &config);
            assert!(
                links.data_acquisition.is_some() ^ links.appointment_booking.is_some(),
                "stage {} should carry exactly one link",
                stage
            );
        }
    }

    #[test]
    fn test_stage_to_link_mapping() {
        let config = LinkConfig::default();

        assert_eq!(
            links_for_stage(LeadStage::Minimal, &config).data_acquisition,
            Some(config.calculator.clone())
        );
        assert_eq!(
            links_for_stage(LeadStage::Qualification, &config).data_acquisition,
            Some(config.qualification.clone())
        );
        assert_eq!(
            links_for_stage(LeadStage::Discovery, &config).data_acquisition,
            Some(config.photo_upload.clone())
        );

        let selling = links_for_stage(LeadStage::Selling, &config);
        assert_eq!(selling.data_acquisition, None);
        assert_eq!(selling.appointment_booking, Some(config.appointment_booking));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let config = LinkConfig::default();
        assert_eq!(
            links_for_stage(LeadStage::Discovery, &config),
            links_for_stage(LeadStage::Discovery, &config)
        );
    }
}
