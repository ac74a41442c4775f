//! Transactional email bodies. Plain string substitution, one placeholder
//! per template.

pub const VERIFICATION_SUBJECT: &str = "Verify your email";
pub const WELCOME_SUBJECT: &str = "Welcome to HomeWatt";
pub const RESET_REQUEST_SUBJECT: &str = "Reset your password";
pub const RESET_SUCCESS_SUBJECT: &str = "Your password was changed";

pub const VERIFICATION_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background: linear-gradient(to right, #10B981, #059669); padding: 20px; text-align: center;">
    <h1 style="color: white; margin: 0;">Verify Your Email</h1>
  </div>
  <div style="background: #f9f9f9; padding: 20px;">
    <p>Hello,</p>
    <p>Thanks for signing up. Your verification code is:</p>
    <div style="text-align: center; margin: 30px 0;">
      <span style="font-size: 32px; font-weight: bold; letter-spacing: 5px; color: #059669;">{code}</span>
    </div>
    <p>Enter this code on the verification page. The code expires in 24 hours.</p>
    <p>If you didn't create an account, you can ignore this email.</p>
  </div>
</body>
</html>"#;

pub const WELCOME_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background: linear-gradient(to right, #10B981, #059669); padding: 20px; text-align: center;">
    <h1 style="color: white; margin: 0;">Welcome to HomeWatt</h1>
  </div>
  <div style="background: #f9f9f9; padding: 20px;">
    <p>Hello {name},</p>
    <p>Your email is verified and your energy dashboard is ready. Log in to
    watch live readings from your home, control your devices and track your
    carbon footprint.</p>
    <p>Best regards,<br>The HomeWatt Team</p>
  </div>
</body>
</html>"#;

pub const RESET_REQUEST_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background: linear-gradient(to right, #10B981, #059669); padding: 20px; text-align: center;">
    <h1 style="color: white; margin: 0;">Password Reset</h1>
  </div>
  <div style="background: #f9f9f9; padding: 20px;">
    <p>Hello,</p>
    <p>We received a request to reset your password. Click the button below
    to choose a new one:</p>
    <div style="text-align: center; margin: 30px 0;">
      <a href="{reset_url}" style="background: #059669; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; font-weight: bold;">Reset Password</a>
    </div>
    <p>This link expires in 1 hour. If you didn't request a reset, you can
    ignore this email.</p>
  </div>
</body>
</html>"#;

pub const RESET_SUCCESS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background: linear-gradient(to right, #10B981, #059669); padding: 20px; text-align: center;">
    <h1 style="color: white; margin: 0;">Password Changed</h1>
  </div>
  <div style="background: #f9f9f9; padding: 20px;">
    <p>Hello,</p>
    <p>Your password was changed successfully. If this wasn't you, contact
    support immediately.</p>
  </div>
</body>
</html>"#;

pub fn render(template: &str, placeholder: &str, value: &str) -> String {
    template.replace(placeholder, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_template_substitutes_code() {
        let html = render(VERIFICATION_TEMPLATE, "{code}", "123456");
        assert!(html.contains("123456"));
        assert!(!html.contains("{code}"));
    }

    #[test]
    fn reset_template_substitutes_url() {
        let url = "http://localhost:5173/reset-password/abc";
        let html = render(RESET_REQUEST_TEMPLATE, "{reset_url}", url);
        assert!(html.contains(url));
        assert!(!html.contains("{reset_url}"));
    }
}
