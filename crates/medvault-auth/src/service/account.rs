//! Registration, login and the bootstrap admin.

use medvault_core::{
    AccountId, MedicalId, ProfessionalId, ProfessionalKind, Role, VerificationStatus, now_utc,
};
use medvault_storage::{
    Account, DoctorIdentity, HospitalIdentity, PatientIdentity, PatientProfile, PortalState,
};

use super::{LoggedIn, LoginRequest, PortalService, RegisterRequest, Registered};
use crate::error::AuthError;

const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;

fn validate_credentials(username: &str, password: &str) -> Result<(), AuthError> {
    if username.trim().is_empty() {
        return Err(AuthError::invalid_request("username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN || username.chars().any(char::is_whitespace) {
        return Err(AuthError::invalid_request(format!(
            "username must be at most {MAX_USERNAME_LEN} characters without spaces"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::invalid_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn fresh_medical_id(state: &PortalState) -> MedicalId {
    let year = now_utc().year();
    loop {
        let candidate = MedicalId::generate(year);
        if state.patient(&candidate).is_none() {
            return candidate;
        }
    }
}

impl PortalService {
    /// Creates an account and its role-specific identity.
    ///
    /// Patients get a medical id and an empty consent set. Doctors and
    /// hospitals start `Pending`. Admins cannot register themselves.
    pub async fn register(&self, request: RegisterRequest) -> Result<Registered, AuthError> {
        validate_credentials(&request.username, &request.password)?;

        if request.role == Role::Admin {
            return Err(AuthError::invalid_request(
                "administrator accounts cannot be self-registered",
            ));
        }

        let hospital_numbers = match request.role {
            Role::Hospital => {
                let gov_reg_no = non_empty(request.gov_reg_no.as_deref()).ok_or_else(|| {
                    AuthError::invalid_request("govRegNo is required for hospitals")
                })?;
                let license_no = non_empty(request.license_no.as_deref()).ok_or_else(|| {
                    AuthError::invalid_request("licenseNo is required for hospitals")
                })?;
                Some((gov_reg_no, license_no))
            }
            _ => None,
        };

        let digest = self
            .credentials
            .hash_async(request.password.clone())
            .await?;

        let registered = self
            .write(|state| {
                if state.username_taken(&request.username) {
                    return Err(AuthError::invalid_request("username already exists"));
                }

                let user_id = AccountId::generate();
                let display_name =
                    non_empty(request.name.as_deref()).unwrap_or_else(|| request.username.clone());
                let mut registered = Registered {
                    user_id: user_id.clone(),
                    role: request.role,
                    medical_id: None,
                    professional_id: None,
                    status: None,
                };

                match request.role {
                    Role::Patient => {
                        let medical_id = fresh_medical_id(state);
                        state.patients.push(PatientIdentity {
                            user_id: user_id.clone(),
                            medical_id: medical_id.clone(),
                            national_id: non_empty(request.national_id.as_deref()),
                            profile: PatientProfile::default(),
                        });
                        state.consents.open(&medical_id);
                        registered.medical_id = Some(medical_id);
                    }
                    Role::Doctor => {
                        let doctor_id = ProfessionalId::generate(ProfessionalKind::Doctor);
                        state.doctors.push(DoctorIdentity {
                            user_id: user_id.clone(),
                            doctor_id: doctor_id.clone(),
                            name: display_name,
                            specialization: non_empty(request.specialization.as_deref())
                                .unwrap_or_else(|| "General".to_string()),
                            status: VerificationStatus::Pending,
                        });
                        registered.professional_id = Some(doctor_id);
                        registered.status = Some(VerificationStatus::Pending);
                    }
                    Role::Hospital => {
                        let (gov_reg_no, license_no) = hospital_numbers.ok_or_else(|| {
                            AuthError::internal("hospital registration lost its numbers")
                        })?;
                        let hospital_id = ProfessionalId::generate(ProfessionalKind::Hospital);
                        state.hospitals.push(HospitalIdentity {
                            user_id: user_id.clone(),
                            hospital_id: hospital_id.clone(),
                            name: display_name,
                            gov_reg_no,
                            license_no,
                            status: VerificationStatus::Pending,
                        });
                        registered.professional_id = Some(hospital_id);
                        registered.status = Some(VerificationStatus::Pending);
                    }
                    Role::Admin => {
                        return Err(AuthError::invalid_request(
                            "administrator accounts cannot be self-registered",
                        ));
                    }
                }

                state.users.push(Account {
                    id: user_id,
                    role: request.role,
                    username: request.username.clone(),
                    password_digest: digest,
                    created_at: now_utc(),
                });

                Ok(registered)
            })
            .await?;

        tracing::info!(
            user_id = %registered.user_id,
            role = %registered.role,
            username = %request.username,
            "Registered account"
        );

        Ok(registered)
    }

    /// Checks credentials and issues a session token.
    ///
    /// Unknown username and wrong password are the same `InvalidCredentials`.
    /// A doctor or hospital awaiting approval gets `AccountNotVerified`, but
    /// only after the password checks out.
    pub async fn login(&self, request: LoginRequest) -> Result<LoggedIn, AuthError> {
        let state = self.snapshot().await?;
        let account = state.account_by_username(&request.username);

        let valid = self
            .credentials
            .verify_async(
                request.password,
                account.map(|a| a.password_digest.clone()),
            )
            .await?;

        let account = match account {
            Some(account) if valid => account,
            _ => {
                tracing::warn!(username = %request.username, "Login failed");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let active = match account.role {
            Role::Doctor => state
                .doctor_by_user(&account.id)
                .is_some_and(|d| d.status.is_active()),
            Role::Hospital => state
                .hospital_by_user(&account.id)
                .is_some_and(|h| h.status.is_active()),
            Role::Patient | Role::Admin => true,
        };
        if !active {
            tracing::info!(username = %account.username, role = %account.role, "Login refused: not verified");
            return Err(AuthError::AccountNotVerified);
        }

        let issued = self.tokens.issue(&account.id, account.role)?;
        tracing::info!(user_id = %account.id, role = %account.role, "Login succeeded");

        Ok(LoggedIn {
            token: issued.token,
            role: account.role,
            expires_at: issued.expires_at,
        })
    }

    /// Creates an admin account unless one already exists. Returns the new
    /// account id, or `None` if nothing was created.
    pub async fn ensure_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AccountId>, AuthError> {
        if self.snapshot().await?.has_role(Role::Admin) {
            return Ok(None);
        }

        validate_credentials(username, password)?;
        let digest = self.credentials.hash_async(password.to_string()).await?;

        let created = self
            .write(|state| {
                if state.has_role(Role::Admin) {
                    return Ok(None);
                }
                if state.username_taken(username) {
                    return Err(AuthError::invalid_request("username already exists"));
                }
                let id = AccountId::generate();
                state.users.push(Account {
                    id: id.clone(),
                    role: Role::Admin,
                    username: username.to_string(),
                    password_digest: digest,
                    created_at: now_utc(),
                });
                Ok(Some(id))
            })
            .await?;

        if let Some(id) = &created {
            tracing::info!(user_id = %id, username, "Created administrator account");
        }
        Ok(created)
    }

    /// Returns `true` if at least one account with `role` exists.
    pub async fn has_accounts(&self, role: Role) -> Result<bool, AuthError> {
        Ok(self.snapshot().await?.has_role(role))
    }
}
