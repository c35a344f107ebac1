//! The fixed set of upstream operations and their routing.

use std::fmt;

use crate::http::HttpMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateUser,
    SendResetPasswordLink,
    VerifyResetPasswordCode,
    PatchUser,
    Authenticate,
    GetUserById,
    GetToken,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::CreateUser,
        Operation::SendResetPasswordLink,
        Operation::VerifyResetPasswordCode,
        Operation::PatchUser,
        Operation::Authenticate,
        Operation::GetUserById,
        Operation::GetToken,
    ];

    pub fn method(self) -> HttpMethod {
        match self {
            Operation::CreateUser
            | Operation::SendResetPasswordLink
            | Operation::VerifyResetPasswordCode
            | Operation::Authenticate => HttpMethod::Post,
            Operation::PatchUser => HttpMethod::Patch,
            Operation::GetUserById | Operation::GetToken => HttpMethod::Get,
        }
    }

    /// Path relative to the base URL. For `GetUserById` and `GetToken` the
    /// path parameter is appended directly after this prefix.
    pub fn path(self) -> &'static str {
        match self {
            Operation::CreateUser => "v1/usercontroller/createuser",
            Operation::SendResetPasswordLink => "v1/usercontroller/sendresetpasswordlink",
            Operation::VerifyResetPasswordCode => {
                "v1/usercontroller/verifyresetpasswordconfirmationcode"
            }
            Operation::PatchUser => "v1/usercontroller/patch",
            Operation::Authenticate => "v1/usercontroller/login",
            Operation::GetUserById => "v1/usercontroller/user/",
            Operation::GetToken => "v1/personaltokencontroller/",
        }
    }

    /// Whether repeating the request cannot cause additional side effects.
    pub fn is_idempotent(self) -> bool {
        self.method() == HttpMethod::Get
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::CreateUser => "create_user",
            Operation::SendResetPasswordLink => "send_reset_password_link",
            Operation::VerifyResetPasswordCode => "verify_reset_password_code",
            Operation::PatchUser => "patch_user",
            Operation::Authenticate => "authenticate",
            Operation::GetUserById => "get_user_by_id",
            Operation::GetToken => "get_token",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
