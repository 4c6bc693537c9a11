//! Interactive terminal form that collects a listing and asks the API for a price.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use immo_predict::client::PredictClient;
use immo_predict::config::ClientConfig;
use immo_predict::models::{Epc, EquippedKitchen, HeatingType, Province, SubpropertyType};
use immo_predict::wizard::{
    format_price, subproperty_label, FormDraft, FormWizard, OutOfBounds, Step,
};

/// Main entry point for the form client.
///
/// Walks the wizard step by step, shows the review table, then posts the listing
/// to `{PREDICT_API_URL}/predict` and prints the estimate.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    let client = PredictClient::new(config.api_url.clone())?;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut wizard = FormWizard::new();

    loop {
        println!();
        println!("== {} ==", wizard.step().title());

        match wizard.step() {
            Step::Landing => {
                println!("Estimate the price of a Belgian home from a few of its attributes.");
                println!("Press Enter to start.");
                read_line(&mut input)?;
                wizard.next();
            }
            Step::PropertyBasics => {
                let draft = wizard.draft_mut();
                ask_bounded(
                    &mut input,
                    "Total area (m²)",
                    draft.features().total_area_sqm,
                    |d, v| d.set_total_area_sqm(v),
                    draft,
                )?;
                ask_bounded(
                    &mut input,
                    "Bedrooms",
                    draft.features().nbr_bedrooms,
                    |d, v| d.set_nbr_bedrooms(v),
                    draft,
                )?;
                ask_bounded(
                    &mut input,
                    "Frontages",
                    draft.features().nbr_frontages,
                    |d, v| d.set_nbr_frontages(v),
                    draft,
                )?;
                let kind = choose(
                    &mut input,
                    "Property type",
                    SubpropertyType::ALL,
                    draft.features().subproperty_type,
                    |k| subproperty_label(*k).to_string(),
                )?;
                draft.set_subproperty_type(kind);
                let province = choose(
                    &mut input,
                    "Province",
                    Province::ALL,
                    draft.features().province,
                    |p| p.to_string(),
                )?;
                draft.set_province(province);
                navigate(&mut input, &mut wizard)?;
            }
            Step::EnergyInstallations => {
                let draft = wizard.draft_mut();
                ask_bounded(
                    &mut input,
                    "Cadastral income (€)",
                    draft.features().cadastral_income,
                    |d, v| d.set_cadastral_income(v),
                    draft,
                )?;
                ask_bounded(
                    &mut input,
                    "Primary energy consumption (kWh/m²)",
                    draft.features().primary_energy_consumption_sqm,
                    |d, v| d.set_primary_energy_consumption_sqm(v),
                    draft,
                )?;
                let epc = choose(&mut input, "EPC", Epc::ALL, draft.features().epc, |e| e.to_string())?;
                draft.set_epc(epc);
                let kitchen = choose(
                    &mut input,
                    "Equipped kitchen",
                    EquippedKitchen::ALL,
                    draft.features().equipped_kitchen,
                    |k| k.to_string(),
                )?;
                draft.set_equipped_kitchen(kitchen);
                let heating = choose(
                    &mut input,
                    "Heating type",
                    HeatingType::ALL,
                    draft.features().heating_type,
                    |h| h.to_string(),
                )?;
                draft.set_heating_type(heating);
                navigate(&mut input, &mut wizard)?;
            }
            Step::Amenities => {
                let draft = wizard.draft_mut();
                let f = draft.features().clone();
                draft.set_terrace(ask_yes_no(&mut input, "Terrace", f.fl_terrace)?);
                draft.set_garden(ask_yes_no(&mut input, "Garden", f.fl_garden)?);
                draft.set_swimming_pool(ask_yes_no(&mut input, "Swimming pool", f.fl_swimming_pool)?);
                draft.set_furnished(ask_yes_no(&mut input, "Furnished", f.fl_furnished)?);
                navigate(&mut input, &mut wizard)?;
            }
            Step::Review => {
                print_review(wizard.draft());
                print!("[s]ubmit, [b]ack: ");
                io::stdout().flush()?;
                match read_line(&mut input)?.as_str() {
                    "b" | "B" => {
                        wizard.previous();
                    }
                    "s" | "S" | "" => {
                        if let Some(features) = wizard.submit() {
                            match client.predict(&features).await {
                                Ok(price) => println!("Estimated price: {}", format_price(price)),
                                Err(e) => println!("Could not get a prediction: {}", e),
                            }
                        }
                    }
                    _ => println!("Please answer 's' or 'b'."),
                }
            }
            Step::Submitted => {
                if ask_yes_no(&mut input, "Make another prediction", true)? {
                    wizard.restart();
                } else {
                    return Ok(());
                }
            }
        }
    }
}

fn read_line(input: &mut impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        anyhow::bail!("input closed");
    }
    Ok(line.trim().to_string())
}

/// Asks for a value until it parses and fits the widget bounds. Empty keeps `current`.
fn ask_bounded<T, B, F>(
    input: &mut B,
    label: &str,
    current: T,
    mut set: F,
    draft: &mut FormDraft,
) -> anyhow::Result<()>
where
    T: FromStr + std::fmt::Display + Copy,
    B: BufRead,
    F: FnMut(&mut FormDraft, T) -> Result<(), OutOfBounds>,
{
    loop {
        print!("{} [{}]: ", label, current);
        io::stdout().flush()?;
        let answer = read_line(input)?;
        if answer.is_empty() {
            return Ok(());
        }
        match answer.parse::<T>() {
            Ok(value) => match set(draft, value) {
                Ok(()) => return Ok(()),
                Err(e) => println!("{}", e),
            },
            Err(_) => println!("'{}' is not a valid number", answer),
        }
    }
}

fn ask_yes_no(input: &mut impl BufRead, label: &str, current: bool) -> anyhow::Result<bool> {
    loop {
        print!("{} [{}]: ", label, if current { "Y/n" } else { "y/N" });
        io::stdout().flush()?;
        match read_line(input)?.to_lowercase().as_str() {
            "" => return Ok(current),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Please answer 'y' or 'n'."),
        }
    }
}

/// Numbered menu over a closed category.
fn choose<T: Copy + PartialEq>(
    input: &mut impl BufRead,
    label: &str,
    options: &[T],
    current: T,
    show: impl Fn(&T) -> String,
) -> anyhow::Result<T> {
    println!("{}:", label);
    for (i, option) in options.iter().enumerate() {
        let marker = if *option == current { "*" } else { " " };
        println!(" {} {:>2}. {}", marker, i + 1, show(option));
    }
    loop {
        print!("Choice [{}]: ", show(&current));
        io::stdout().flush()?;
        let answer = read_line(input)?;
        if answer.is_empty() {
            return Ok(current);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(options[n - 1]),
            _ => println!("Pick a number between 1 and {}", options.len()),
        }
    }
}

fn navigate(input: &mut impl BufRead, wizard: &mut FormWizard) -> anyhow::Result<()> {
    print!("Enter to continue, 'b' to go back: ");
    io::stdout().flush()?;
    if read_line(input)?.eq_ignore_ascii_case("b") {
        wizard.previous();
    } else {
        wizard.next();
    }
    Ok(())
}

fn print_review(draft: &FormDraft) {
    let rows = draft.review_rows();
    let width = rows.iter().map(|(label, _)| label.chars().count()).max().unwrap_or(0);
    println!("{:-<1$}", "", width + 24);
    for (label, value) in rows {
        println!("{:<width$}  {}", label, value, width = width);
    }
    println!("{:-<1$}", "", width + 24);
}
