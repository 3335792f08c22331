//! Built-in fallback dataset.
//!
//! A handful of entries describing a typical membership/content platform.
//! Sessions are seeded with it when no repository is configured, and degrade
//! to it when exploration finds nothing, so questions always have something
//! to answer from.

use crate::entry::EntryBuilder;
use crate::models::{EntryType, KnowledgeEntry};

/// Metadata key set on every fallback entry.
pub const FALLBACK_MARKER: &str = "fallback";

struct Seed {
    entry_type: EntryType,
    path: &'static str,
    name: &'static str,
    content: &'static str,
}

const SEEDS: &[Seed] = &[
    Seed {
        entry_type: EntryType::Function,
        path: "src/services/subscription.service.ts",
        name: "createSubscription",
        content: "function createSubscription(memberId, planId)\n\
                  Creates a Stripe customer for the member if needed, starts a recurring \
                  subscription for the selected plan and records the payment method.",
    },
    Seed {
        entry_type: EntryType::Function,
        path: "src/services/payment.service.ts",
        name: "handlePaymentWebhook",
        content: "function handlePaymentWebhook(event)\n\
                  Processes Stripe webhook events: invoice.paid renews the subscription, \
                  invoice.payment_failed moves the member into the past-due state.",
    },
    Seed {
        entry_type: EntryType::Function,
        path: "src/services/auth.service.ts",
        name: "login",
        content: "function login(email, password)\n\
                  Validates credentials, issues a session token and refreshes the \
                  authentication cookie for the member.",
    },
    Seed {
        entry_type: EntryType::Export,
        path: "src/services/content.service.ts",
        name: "publishContent",
        content: "export publishContent: Moves a draft post through review and publishes \
                  it to members whose subscription tier grants access to the content.",
    },
    Seed {
        entry_type: EntryType::Comment,
        path: "src/models/member.ts",
        name: "MemberState",
        content: "Member state machine: a member is free, trialing, active, past_due or \
                  cancelled. Payment events drive every transition between states.",
    },
    Seed {
        entry_type: EntryType::ApiRoute,
        path: "src/api/routes.ts",
        name: "POST /api/subscriptions",
        content: "api route POST /api/subscriptions\n\
                  Starts a subscription checkout for the authenticated member.",
    },
    Seed {
        entry_type: EntryType::JobSchedule,
        path: "src/jobs/renewals.ts",
        name: "0 3 * * *",
        content: "scheduled job: nightly renewal run retries failed subscription payments \
                  and sends expiry reminders to members.",
    },
    Seed {
        entry_type: EntryType::TextContent,
        path: "README.md",
        name: "README.md",
        content: "Platform architecture: a web frontend component layer talks to an API \
                  server; services for auth, content, subscription and payment sit behind \
                  it with a database and background job workers.",
    },
];

/// Fresh copies of the fallback entries, with new ids.
pub fn fallback_entries() -> Vec<KnowledgeEntry> {
    SEEDS
        .iter()
        .map(|s| {
            EntryBuilder::new(s.entry_type, s.path, s.content)
                .meta("name", s.name)
                .meta("source", FALLBACK_MARKER)
                .build()
        })
        .collect()
}

pub fn is_fallback(entry: &KnowledgeEntry) -> bool {
    entry.metadata.get("source").map(String::as_str) == Some(FALLBACK_MARKER)
}
