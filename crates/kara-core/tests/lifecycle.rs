// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Properties of the task lifecycle over arbitrary status walks.

use kara_core::TaskStatus;
use proptest::prelude::*;

const ALL: [TaskStatus; 6] = [
    TaskStatus::Pending,
    TaskStatus::Processing,
    TaskStatus::Reprocessing,
    TaskStatus::Done,
    TaskStatus::Failed,
    TaskStatus::DeadLetter,
];

fn status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(ALL.to_vec())
}

proptest! {
    #[test]
    fn done_is_absorbing(next in status()) {
        prop_assert!(!TaskStatus::Done.can_transition_to(next));
    }

    #[test]
    fn done_only_follows_an_attempt(from in status()) {
        if from.can_transition_to(TaskStatus::Done) {
            prop_assert!(matches!(from, TaskStatus::Processing | TaskStatus::Reprocessing));
        }
    }

    #[test]
    fn polling_never_leaves_terminal_states(from in status()) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(TaskStatus::Processing));
            prop_assert!(!from.can_transition_to(TaskStatus::Pending));
        }
    }

    #[test]
    fn accepted_walks_end_in_done_at_most_once(
        walk in prop::collection::vec(status(), 1..12)
    ) {
        let mut current = TaskStatus::Pending;
        let mut done_count = 0;
        for next in walk {
            if current.can_transition_to(next) {
                current = next;
                if current == TaskStatus::Done {
                    done_count += 1;
                }
            }
        }
        prop_assert!(done_count <= 1);
    }
}
