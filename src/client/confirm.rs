/// Asks the user a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub const DELETE_POST_PROMPTS: [&str; 2] = [
    "Delete this post?",
    "This cannot be undone. Delete the post and all its comments and likes?",
];

pub const DELETE_ACCOUNT_PROMPTS: [&str; 2] = [
    "Delete your account?",
    "This permanently removes your profile, posts, comments, likes and follows. Continue?",
];

/// Both prompts must be accepted; the second is not asked if the first is declined.
pub fn confirm_twice(confirm: &mut impl Confirm, prompts: [&str; 2]) -> bool {
    prompts.iter().all(|prompt| confirm.confirm(prompt))
}
