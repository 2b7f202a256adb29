mod login;
mod password_reset;
mod project_detail;
mod project_form;
mod project_list;
mod register;
mod verify_otp;

pub use login::LoginView;
pub use password_reset::PasswordResetView;
pub use project_detail::ProjectDetailView;
pub use project_form::ProjectFormView;
pub use project_list::ProjectListView;
pub use register::RegisterView;
pub use verify_otp::VerifyOtpView;
