#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    SendCaptchaMail { email: String, captcha: String },
}

impl AppCommand {
    pub fn recipient(&self) -> &str {
        match self {
            AppCommand::SendCaptchaMail { email, .. } => email,
        }
    }
}
