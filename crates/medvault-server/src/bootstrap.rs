//! First-start seeding.
//!
//! Creates the configured administrator when no admin exists and, if enabled,
//! a demo hospital, doctor and patient. Demo professionals are left `Pending`
//! so the approval flow can be exercised. Safe to run on every start.

use medvault_auth::service::RegisterRequest;
use medvault_auth::{AuthResult, PortalService};
use medvault_core::Role;
use tracing::{info, warn};

use crate::config::BootstrapConfig;

/// Runs all bootstrap steps.
///
/// # Errors
///
/// Returns an error if an account cannot be created.
pub async fn run(service: &PortalService, config: &BootstrapConfig) -> AuthResult<()> {
    match &config.admin_user {
        Some(admin) => {
            if let Some(id) = service
                .ensure_admin(&admin.username, &admin.password)
                .await?
            {
                info!(user_id = %id, username = %admin.username, "Bootstrap admin created");
            }
        }
        None => {
            if !service.has_accounts(Role::Admin).await? {
                warn!("No administrator configured; set bootstrap.admin_user to approve professionals");
            }
        }
    }

    if config.demo_data {
        seed_demo_data(service).await?;
    }
    Ok(())
}

fn demo_accounts() -> Vec<RegisterRequest> {
    let mut hospital = RegisterRequest::new(Role::Hospital, "citycare", "hospital123");
    hospital.name = Some("CityCare Hospital".into());
    hospital.gov_reg_no = Some("MOCKREG".into());
    hospital.license_no = Some("MOCKLIC".into());

    let mut doctor = RegisterRequest::new(Role::Doctor, "drrao", "doctor123");
    doctor.name = Some("Dr. Rao".into());
    doctor.specialization = Some("Cardiology".into());

    let mut patient = RegisterRequest::new(Role::Patient, "john", "patient123");
    patient.national_id = Some("MOCK".into());

    vec![hospital, doctor, patient]
}

/// Seeds one demo account per role that has no accounts yet.
async fn seed_demo_data(service: &PortalService) -> AuthResult<()> {
    for request in demo_accounts() {
        if service.has_accounts(request.role).await? {
            continue;
        }
        let username = request.username.clone();
        let registered = service.register(request).await?;
        info!(
            username = %username,
            role = %registered.role,
            "Seeded demo account"
        );
    }
    Ok(())
}
