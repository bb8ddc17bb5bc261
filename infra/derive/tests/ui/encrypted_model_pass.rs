use fcrypt_derive::encrypted_model;

pub trait EncryptedModel {
    const NAME: &'static str;
    const SENSITIVE_FIELDS: &'static [&'static str];
}

#[encrypted_model(crate = "crate", name = "credential", fields("provider.secret"))]
#[allow(dead_code)]
pub struct Credential {
    #[encrypted]
    pub access_token: String,
    pub user_id: String,
}

#[encrypted_model(crate = "crate")]
#[allow(dead_code)]
pub struct Generic<T> {
    #[encrypted]
    pub secret: String,
    pub payload: T,
}

fn main() {
    assert_eq!(Credential::NAME, "credential");
    assert_eq!(Credential::SENSITIVE_FIELDS, &["access_token", "provider.secret"]);
    assert_eq!(<Generic<u8> as EncryptedModel>::NAME, "Generic");
    assert_eq!(<Generic<u8> as EncryptedModel>::SENSITIVE_FIELDS, &["secret"]);
}
