use reqwest::multipart::Form;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Body of `POST /Login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub identity: &'a str,
    pub password: &'a str,
}

/// Extra fields sent when registering a company account rather than a
/// personal one.
#[derive(Debug, Clone, Default)]
pub struct CompanyDetails {
    pub type_of_legal: String,
    pub company_name: String,
    pub commercial_register_number: String,
    pub articles_of_incorporation_expiry: String,
    pub commercial_register_expiry: Option<String>,
}

/// Text fields of the `/Register/User` multipart form.
///
/// Document uploads (picture, contract, commercial register scans) are not
/// sent from here.
#[derive(Debug)]
pub struct RegistrationForm {
    pub full_name: String,
    pub identity: String,
    pub date_of_birth: String,
    pub address: String,
    pub phone_number: String,
    pub email: String,
    pub contract_type: Option<String>,
    pub contract_hours: Option<String>,
    pub contract_duration: Option<String>,
    pub password: SecretString,
    pub company: Option<CompanyDetails>,
}

impl RegistrationForm {
    /// Field name/value pairs in the order the backend expects them.
    ///
    /// The backend takes the password under `passwordHash` and requires a
    /// matching `confirmPassword`.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("fullName", self.full_name.clone()),
            ("identity", self.identity.clone()),
            ("dateOfBirth", self.date_of_birth.clone()),
            ("address", self.address.clone()),
            ("phoneNumber", self.phone_number.clone()),
            ("email", self.email.clone()),
            ("contractType", self.contract_type.clone().unwrap_or_default()),
            ("contractHours", self.contract_hours.clone().unwrap_or_default()),
            ("contractDuration", self.contract_duration.clone().unwrap_or_default()),
            ("passwordHash", self.password.expose_secret().to_string()),
            ("confirmPassword", self.password.expose_secret().to_string()),
        ];

        if let Some(ref company) = self.company {
            fields.push(("typeOfLegal", company.type_of_legal.clone()));
            fields.push(("companyName", company.company_name.clone()));
            fields.push((
                "commercialRegisterNumber",
                company.commercial_register_number.clone(),
            ));
            fields.push((
                "articlesOfIncorporationExpiry",
                company.articles_of_incorporation_expiry.clone(),
            ));
            if let Some(ref expiry) = company.commercial_register_expiry {
                fields.push(("commercialRegisterExpiry", expiry.clone()));
            }
        }

        fields
    }

    pub fn to_multipart(&self) -> Form {
        self.fields()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
    }
}
