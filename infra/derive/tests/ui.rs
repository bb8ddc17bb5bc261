#[test]
fn fcrypt_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/fcrypt_error_pass.rs");
}

#[test]
fn encrypted_model_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/encrypted_model_pass.rs");
}
