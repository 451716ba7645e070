use super::{Error, MethodKey, Registry, Settings, TargetTracker};

/// Load registrations and exclusions from a text file
///
/// Each line holds one directive, and `#` starts a comment:
///
/// ```text
/// # tracked type, followed by classes statically known to be subtypes of it
/// type <tracked> [<subtype>...]
///
/// redirect <owner> <name> <descriptor> <tracked> <replacement owner> <replacement name> <replacement descriptor>
///
/// exclude <class>
/// exclude-prefix <prefix>
/// ```
///
/// Tracked types mentioned in a `redirect` are registered if they weren't already.
pub fn load_registrations(
    source: &str,
    registry: &mut Registry,
    settings: &mut Settings,
) -> Result<(), Error> {
    for (line_idx, line) in source.lines().enumerate() {
        let line_number = line_idx + 1;
        let line = match line.find('#') {
            Some(comment_start) => &line[..comment_start],
            None => line,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        load_directive(&words, registry, settings).map_err(|err| {
            let message = match err {
                Error::MalformedRegistration { message, .. } => message,
                other => other.to_string(),
            };
            Error::MalformedRegistration {
                line: line_number,
                message,
            }
        })?;
    }
    Ok(())
}

fn load_directive(
    words: &[&str],
    registry: &mut Registry,
    settings: &mut Settings,
) -> Result<(), Error> {
    match words {
        [] => (),
        ["type", tracked, subtypes @ ..] => {
            let tracked = registry.register_type(tracked)?;
            for subtype in subtypes {
                registry.add_known_subtype(tracked, subtype)?;
            }
        }
        ["redirect", owner, name, descriptor, tracked, target_owner, target_name, target_descriptor] =>
        {
            let method = MethodKey::parse(owner, name, descriptor)?;
            let tracked = registry.register_type(tracked)?;
            let target = TargetTracker::parse(target_owner, target_name, target_descriptor)?;
            registry.register_redirect(method, tracked, target)?;
        }
        ["exclude", class] => settings.exclude_class(class)?,
        ["exclude-prefix", prefix] => settings.exclude_prefix(prefix),
        [directive @ ("type" | "redirect" | "exclude" | "exclude-prefix"), ..] => {
            return Err(malformed(format!(
                "wrong number of arguments for '{}'",
                directive
            )))
        }
        [other, ..] => return Err(malformed(format!("unknown directive '{}'", other))),
    }
    Ok(())
}

fn malformed(message: String) -> Error {
    Error::MalformedRegistration { line: 0, message }
}
