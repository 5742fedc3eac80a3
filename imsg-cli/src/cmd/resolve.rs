//! Resolution commands: resolve, label.

use imsg::{AuthStatus, ContactLookup};

use super::ResolveArgs;
use crate::display;

/// Resolve handles and print a table or JSON.
pub fn run(args: &ResolveArgs) -> imsg::Result<()> {
    if args.request && imsg::auth_status()? == AuthStatus::NotDetermined {
        imsg::request_access()?;
    }

    let records = imsg::resolve_with_flags(&args.handles, args.flags)?.records()?;
    if args.json {
        println!("{}", display::records_json(&records));
    } else {
        print!("{}", display::records_table(&records));
    }
    Ok(())
}

/// Print `value<TAB>label` for every value.
pub fn label(values: &[String]) -> imsg::Result<()> {
    let names = ContactLookup::resolve(values);
    for value in values {
        println!("{value}\t{}", ContactLookup::label(value, &names));
    }
    Ok(())
}
