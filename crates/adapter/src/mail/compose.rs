use crate::traits::OutgoingMail;
use domain::AppCommand;

pub fn compose(cmd: &AppCommand) -> OutgoingMail {
    match cmd {
        AppCommand::SendCaptchaMail { email, captcha } => OutgoingMail {
            to: email.clone(),
            subject: "博客注册验证码".to_string(),
            body: format!(
                "您的验证码是 {}，请在页面中填写以完成注册。如非本人操作请忽略此邮件。",
                captcha
            ),
        },
    }
}
