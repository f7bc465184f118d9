//! Built-in prompt definitions.
//!
//! Each can be overridden by dropping `<id>.yml` into `.pigeon/prompts/`.

/// System persona for drafting a reply.
pub const REPLY_SYSTEM_ID: &str = "support.reply.system";

/// Closing reminder sent after the grounding context.
pub const REPLY_REMINDER_ID: &str = "support.reply.reminder";

/// Instruction for decomposing an email into questions.
pub const SPLIT_ID: &str = "support.split";

const REPLY_SYSTEM: &str = r#"
id: support.reply.system
title: Support reply persona
apiVersion: "1.0"
variables: [sender, organization, signoff]
template: >-
  You are an organizer for {{organization}}. You are responsible for
  responding to an email from a participant. Please write an email response
  to the participant. Begin the email with the header 'Dear [First Name]'
  where '[First Name]' is the participant's first name and end the email with
  the footer '{{signoff}}'. Do not include the subject line in your response.
  The participant's email address is {{sender}}. You receive documents to help
  you answer the email. Please do not include information that is not
  explicitly stated in the documents. It is very important to keep responses
  brief and only answer the questions asked. However, please write the emails
  in a friendly tone.
"#;

const REPLY_REMINDER: &str = r#"
id: support.reply.reminder
title: Support reply closing reminder
apiVersion: "1.0"
template: >-
  Once again, please do not include information that is not explicitly stated
  in the documents. It is very important to keep responses brief and only
  answer the questions asked. Please write the emails in a friendly tone.
"#;

const SPLIT: &str = r#"
id: support.split
title: Question splitter
apiVersion: "1.0"
variables: [organization]
template: >-
  You are an organizer for {{organization}}. Please parse incoming emails from
  participants into separate questions. Return a list of questions in the
  format of a python list.
"#;

/// Raw YAML of a built-in prompt.
pub fn builtin_source(id: &str) -> Option<&'static str> {
    match id {
        REPLY_SYSTEM_ID => Some(REPLY_SYSTEM),
        REPLY_REMINDER_ID => Some(REPLY_REMINDER),
        SPLIT_ID => Some(SPLIT),
        _ => None,
    }
}

/// Ids of every built-in prompt.
pub fn builtin_ids() -> [&'static str; 3] {
    [REPLY_SYSTEM_ID, REPLY_REMINDER_ID, SPLIT_ID]
}
