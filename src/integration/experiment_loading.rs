use crate::nn::model_builder::ModelParams;
use crate::train::trainer::TrainOptions;
use std::path::PathBuf;
use std::{error::Error, fmt::Display};
use xmltree::{Element, XMLNode};

#[derive(Debug)]
pub enum XmlError {
    ParseError(String),
    ElementNotFound(&'static str),
    UnexpectedTag(String),
    AttributeNotFound(String, &'static str),
    AttributeParseError(String, &'static str, String),
}

impl Display for XmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseError(e) => write!(f, "Invalid XML: {}", e)?,
            Self::ElementNotFound(e) => write!(f, "Element <{}> not found", e)?,
            Self::UnexpectedTag(e) => write!(f, "Unexpected tag <{}>", e)?,
            Self::AttributeNotFound(tag, name) => {
                write!(f, "Attribute '{}' not found in <{}>", name, tag)?
            }
            Self::AttributeParseError(tag, name, value) => write!(
                f,
                "Value '{}' isn't in the correct format for attribute '{}' in tag <{}>",
                value, name, tag
            )?,
        }
        Ok(())
    }
}

impl Error for XmlError {}

type Result<T> = std::result::Result<T, XmlError>;

/// A full experiment description: the architecture to build, the training options
/// to run it with, and the dataset slicing applied before training.
#[derive(Clone, Debug)]
pub struct ExperimentConfig {
    pub name: String,
    pub model: ModelParams,
    pub training: TrainOptions,
    pub label_range: Option<(usize, usize)>,
    pub positive_class: usize,
}

pub fn load_experiment_xml(bytes: &[u8]) -> Result<ExperimentConfig> {
    let elements =
        Element::parse_all(bytes).map_err(|e| XmlError::ParseError(e.to_string()))?;

    let mut root = None;
    for e in iter_elements(&elements) {
        if e.name != "Experiment" {
            return Err(XmlError::UnexpectedTag(e.name.clone()));
        } else {
            root = Some(e)
        }
    }
    let root = root.ok_or(XmlError::ElementNotFound("Experiment"))?;
    let name = get_string_attr(root, "name")?;

    let mut input = None;
    let mut model = None;
    let mut training = None;
    let mut labels = None;
    for e in iter_elements(&root.children) {
        match e.name.as_str() {
            "Input" => input = Some(e),
            "Model" => model = Some(e),
            "Training" => training = Some(e),
            "Labels" => labels = Some(e),
            _ => return Err(XmlError::UnexpectedTag(e.name.clone())),
        }
    }

    let input = input.ok_or(XmlError::ElementNotFound("Input"))?;
    let model = model.ok_or(XmlError::ElementNotFound("Model"))?;
    let training = training.ok_or(XmlError::ElementNotFound("Training"))?;

    let input_shape = (
        get_usize_attr(input, "height")?,
        get_usize_attr(input, "width")?,
        get_usize_attr(input, "channels")?,
    );

    let binary = get_opt_bool_attr(model, "binary")?.unwrap_or(false);
    let model_params = ModelParams {
        input_shape,
        class_count: get_usize_attr(model, "class_count")?,
        filter_counts: get_usize_list_attr(model, "filters")?,
        kernel_size: get_usize_attr(model, "kernel_size")?,
        dense_layers: get_usize_list_attr(model, "dense_layers")?,
        dropout_rate: get_f32_attr(model, "dropout_rate")?,
        learning_rate: get_f32_attr(model, "learning_rate")?,
        binary,
    };

    let train_options = TrainOptions {
        mb_size: get_usize_attr(training, "mb_size")?,
        nb_epochs: get_usize_attr(training, "nb_epochs")?,
        steps_per_epoch: get_usize_attr(training, "steps_per_epoch")?,
        augment_on_the_fly: get_opt_bool_attr(training, "augment_on_the_fly")?.unwrap_or(true),
        ckpt_path: training
            .attributes
            .get("ckpt_file")
            .map(|o| PathBuf::from(o.as_str())),
    };

    let label_range = match labels {
        Some(e) => Some((get_usize_attr(e, "min")?, get_usize_attr(e, "max")?)),
        None => None,
    };

    Ok(ExperimentConfig {
        name,
        model: model_params,
        training: train_options,
        label_range,
        positive_class: get_opt_usize_attr(model, "positive_class")?.unwrap_or(0),
    })
}

fn iter_elements(children: &[XMLNode]) -> impl Iterator<Item = &Element> {
    children.iter().filter_map(|o| match o {
        XMLNode::Element(e) => Some(e),
        _ => None,
    })
}

fn get_string_attr(element: &Element, name: &'static str) -> Result<String> {
    element
        .attributes
        .get(name)
        .cloned()
        .ok_or_else(|| XmlError::AttributeNotFound(element.name.clone(), name))
}

fn get_usize_attr(element: &Element, name: &'static str) -> Result<usize> {
    let value = get_string_attr(element, name)?;
    value.parse().map_err(|_| {
        XmlError::AttributeParseError(element.name.clone(), name, value.clone())
    })
}

fn get_opt_usize_attr(element: &Element, name: &'static str) -> Result<Option<usize>> {
    match element.attributes.get(name) {
        Some(_) => Ok(Some(get_usize_attr(element, name)?)),
        None => Ok(None),
    }
}

fn get_f32_attr(element: &Element, name: &'static str) -> Result<f32> {
    let value = get_string_attr(element, name)?;
    value.parse().map_err(|_| {
        XmlError::AttributeParseError(element.name.clone(), name, value.clone())
    })
}

fn get_opt_bool_attr(element: &Element, name: &'static str) -> Result<Option<bool>> {
    match element.attributes.get(name) {
        Some(value) => value.parse().map(Some).map_err(|_| {
            XmlError::AttributeParseError(element.name.clone(), name, value.clone())
        }),
        None => Ok(None),
    }
}

/// Whitespace separated list, e.g. `filters="20 20 40"`. An empty or missing
/// attribute is an empty list.
fn get_usize_list_attr(element: &Element, name: &'static str) -> Result<Vec<usize>> {
    let value = match element.attributes.get(name) {
        Some(v) => v.clone(),
        None => return Ok(Vec::new()),
    };
    value
        .split_whitespace()
        .map(|o| {
            o.parse().map_err(|_| {
                XmlError::AttributeParseError(element.name.clone(), name, value.clone())
            })
        })
        .collect()
}
