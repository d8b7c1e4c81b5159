// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Roll-up of child extract states into a backend state.

use crate::domain::entities::ExtractState;

/// `Failed` wins over everything; `Succeed` needs a non-empty, uniformly
/// succeeding set; anything else is `New`.
pub fn aggregate_state<I>(states: I) -> ExtractState
where
    I: IntoIterator<Item = ExtractState>,
{
    let mut seen_any = false;
    let mut all_succeed = true;
    for state in states {
        seen_any = true;
        match state {
            ExtractState::Failed => return ExtractState::Failed,
            ExtractState::New => all_succeed = false,
            ExtractState::Succeed => {}
        }
    }
    if seen_any && all_succeed {
        ExtractState::Succeed
    } else {
        ExtractState::New
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExtractState::*;

    #[test]
    fn test_empty_set_is_new() {
        assert_eq!(aggregate_state(Vec::new()), New);
    }

    #[test]
    fn test_any_failure_fails() {
        assert_eq!(aggregate_state(vec![Succeed, Failed, New]), Failed);
        assert_eq!(aggregate_state(vec![Failed]), Failed);
    }

    #[test]
    fn test_uniform_success() {
        assert_eq!(aggregate_state(vec![Succeed, Succeed]), Succeed);
        assert_eq!(aggregate_state(vec![Succeed, New]), New);
    }
}
