//! cloud-init user data for new droplets
//!
//! DigitalOcean has no root password field on create; the password is set on
//! first boot through a `chpasswd` cloud-config instead.

/// cloud-config that sets the root password and enables password SSH login
pub fn root_password_config(password: &str) -> String {
    // A JSON string literal is also a valid YAML double-quoted scalar
    let quoted = serde_json::Value::String(password.to_string()).to_string();
    format!(
        r#"#cloud-config
chpasswd:
  expire: false
  users:
    - name: root
      password: {quoted}
      type: text
ssh_pwauth: true
"#
    )
}

/// Pick the user data sent with a create request.
///
/// Caller-supplied user data wins; the root password is then not applied.
pub fn resolve_user_data(user_data: Option<&str>, root_password: Option<&str>) -> Option<String> {
    let root_password = root_password.filter(|p| !p.is_empty());
    match (user_data.filter(|u| !u.trim().is_empty()), root_password) {
        (Some(custom), Some(_)) => {
            tracing::warn!("Custom user_data supplied; root password will not be set via cloud-init");
            Some(custom.to_string())
        }
        (Some(custom), None) => Some(custom.to_string()),
        (None, Some(password)) => Some(root_password_config(password)),
        (None, None) => None,
    }
}
