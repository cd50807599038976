// Copyright (C) 2021-2026  Veridoc Labs Ltd. (VDL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

// Writes only the top-level error.
impl<E> std::fmt::Display for crate::Error<E>
where
    E: crate::CoreError,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

// Goes through the whole error chain and writes all the errors.
impl<E> std::fmt::Debug for crate::Error<E>
where
    E: crate::CoreError,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;

        // Write the error variant
        let error_esc = json_escape(&self.error.to_string());
        write!(f, "\"error\":{}", error_esc)?;

        // Write the current context if present
        if !self.context.is_empty() {
            write!(f, ",\"context\":[")?;

            // Write the first element without the "," in front
            let ctx_esc = json_escape(&self.context[0].to_string());
            write!(f, "{}", ctx_esc)?;

            // Write other elements with the "," in front
            for context in self.context.iter().skip(1) {
                let ctx_esc = json_escape(&context.to_string());
                write!(f, ",{}", ctx_esc)?;
            }

            write!(f, "]")?;
        }

        // Write the source of the error
        if let Some(source) = &self.source {
            write!(f, ",\"source\":")?;

            match source {
                // If it is a known source, use its Debug output
                crate::ErrorSource::KnownError(source) => {
                    write!(f, "{:?}", source)?;
                }
                // If it is a foreign error, use the recursive helper function
                crate::ErrorSource::ForeignError(source) => {
                    debug_foreign_error(source.as_ref(), f)?;
                }
            }
        }

        write!(f, "}}")
    }
}

fn debug_foreign_error(
    error: &dyn std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    write!(f, "{{")?;

    // Write the error debug
    let error_esc = json_escape(&format!(r"{:?}", error));
    write!(f, "\"error\":{}", error_esc)?;

    // Write the source of the error
    if let Some(source) = error.source() {
        write!(f, ",\"source\":")?;

        debug_foreign_error(source, f)?;
    }

    write!(f, "}}")
}

fn json_escape(value: &str) -> String {
    serde_json::json!(value).to_string()
}
