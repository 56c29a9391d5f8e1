//! Login handshake for the controller's telnet port.
//!
//! ```text
//! AwaitUsernamePrompt --"login:"--> AwaitPasswordPrompt --"password:"--> AwaitBanner
//! AwaitBanner --"GNET>"--> Authenticated
//! AwaitBanner --"login:"--> Rejected
//! ```
//! The controller answers a wrong password by prompting for the username
//! again, so only the `GNET>` banner confirms the login. The state machine
//! only decides what to do with each line. Writing the credentials and
//! flushing queued commands is left to the session.

/// Position in the login handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginState {
    /// Waiting for the `login:` prompt.
    #[default]
    AwaitUsernamePrompt,
    /// Username sent, waiting for the `password:` prompt.
    AwaitPasswordPrompt,
    /// Password sent, waiting for the controller to accept it.
    AwaitBanner,
    /// Banner seen; every line is a protocol line.
    Authenticated,
    /// The controller refused the credentials.
    Rejected,
}

/// What the session should do in response to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// Write the username.
    SendUsername,
    /// Write the password.
    SendPassword,
    /// The controller accepted the credentials. The line may still carry a
    /// status after the banner.
    Confirmed,
    /// The controller refused the credentials.
    Rejected,
    /// Line did not match the expected prompt; stay in the current state.
    Unexpected,
    /// Already authenticated; hand the line to the status parser.
    Deliver,
}

impl LoginState {
    /// Advances the state machine with one inbound line.
    pub fn advance(&mut self, line: &str) -> LoginStep {
        match self {
            Self::AwaitUsernamePrompt => {
                if is_prompt(line, "login:") {
                    *self = Self::AwaitPasswordPrompt;
                    LoginStep::SendUsername
                } else {
                    LoginStep::Unexpected
                }
            }
            Self::AwaitPasswordPrompt => {
                if is_prompt(line, "password:") {
                    *self = Self::AwaitBanner;
                    LoginStep::SendPassword
                } else {
                    LoginStep::Unexpected
                }
            }
            Self::AwaitBanner => {
                if is_prompt(line, "gnet>") {
                    *self = Self::Authenticated;
                    LoginStep::Confirmed
                } else if is_prompt(line, "login:") {
                    *self = Self::Rejected;
                    LoginStep::Rejected
                } else {
                    LoginStep::Unexpected
                }
            }
            Self::Authenticated => LoginStep::Deliver,
            Self::Rejected => LoginStep::Rejected,
        }
    }

    /// Returns true once the controller has accepted the credentials.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

fn is_prompt(line: &str, prompt: &str) -> bool {
    line.to_ascii_lowercase().contains(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_handshake() {
        let mut state = LoginState::default();

        assert_eq!(state.advance("login: "), LoginStep::SendUsername);
        assert_eq!(state, LoginState::AwaitPasswordPrompt);

        assert_eq!(state.advance("password: "), LoginStep::SendPassword);
        assert!(!state.is_authenticated());

        assert_eq!(state.advance("GNET> "), LoginStep::Confirmed);
        assert!(state.is_authenticated());

        assert_eq!(state.advance("~OUTPUT,1,1,0.00"), LoginStep::Deliver);
        assert_eq!(state.advance("login: "), LoginStep::Deliver);
    }

    #[test]
    fn test_prompts_are_case_insensitive() {
        let mut state = LoginState::default();
        assert_eq!(state.advance("LOGIN: "), LoginStep::SendUsername);
        assert_eq!(state.advance("Password: "), LoginStep::SendPassword);
        assert_eq!(state.advance("gnet> "), LoginStep::Confirmed);
    }

    #[test]
    fn test_desync_stays_in_state() {
        let mut state = LoginState::default();

        assert_eq!(state.advance("password: "), LoginStep::Unexpected);
        assert_eq!(state, LoginState::AwaitUsernamePrompt);

        state.advance("login: ");
        assert_eq!(state.advance("GNET> "), LoginStep::Unexpected);
        assert_eq!(state, LoginState::AwaitPasswordPrompt);

        assert_eq!(state.advance("password: "), LoginStep::SendPassword);
        assert_eq!(state.advance("RadioRA Main Repeater"), LoginStep::Unexpected);
        assert_eq!(state, LoginState::AwaitBanner);
    }

    #[test]
    fn test_login_prompt_after_password_is_rejection() {
        let mut state = LoginState::default();
        state.advance("login: ");
        state.advance("password: ");

        assert_eq!(state.advance("bad login"), LoginStep::Unexpected);
        assert_eq!(state.advance("login: "), LoginStep::Rejected);
        assert_eq!(state, LoginState::Rejected);
        assert!(!state.is_authenticated());

        // Stays rejected for the rest of the connection
        assert_eq!(state.advance("password: "), LoginStep::Rejected);
        assert_eq!(state.advance("GNET> "), LoginStep::Rejected);
    }
}
